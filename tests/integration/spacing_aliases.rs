//! `VoxelSpacing10.0` on one side and `VoxelSpacing10.000` on the other are one entity

use super::test_utils::Project;
use copick::{CopickError, Provenance};

#[test]
fn test_spacing_spellings_merge() {
    let project = Project::new();
    project.write_static("ExperimentRuns/TS_1/VoxelSpacing10.0/wbp.zarr/.zattrs", b"{}");
    project.write_overlay(
        "ExperimentRuns/TS_1/VoxelSpacing10.000/denoised.zarr/.zattrs",
        b"{}",
    );
    let root = project.open();
    let run = root.get_run("TS_1").unwrap();
    assert_eq!(run.provenance(), Provenance::Both);

    let spacings = run.voxel_spacings().unwrap();
    assert_eq!(spacings.len(), 1);
    assert_eq!(spacings[0].provenance(), Provenance::Both);
    assert_eq!(spacings[0].voxel_size(), 10.0);

    let spacing = run.get_voxel_spacing(10.0).unwrap();
    let tomograms: Vec<(String, Provenance)> = spacing
        .tomograms()
        .unwrap()
        .iter()
        .map(|t| (t.tomo_type().to_string(), t.provenance()))
        .collect();
    assert_eq!(
        tomograms,
        vec![
            ("denoised".to_string(), Provenance::OverlayOnly),
            ("wbp".to_string(), Provenance::StaticOnly),
        ]
    );
}

#[test]
fn test_static_spelling_still_serves_reads() {
    let project = Project::new();
    project.write_static("ExperimentRuns/TS_1/VoxelSpacing10.0/wbp.zarr/.zattrs", b"{\"a\":1}");
    project.write_static("ExperimentRuns/TS_1/VoxelSpacing10.0/wbp.zarr/0/.zarray", b"{}");
    let root = project.open();
    let tomogram = root
        .get_run("TS_1")
        .unwrap()
        .get_voxel_spacing(10.000)
        .unwrap()
        .get_tomogram("wbp")
        .unwrap();
    assert_eq!(tomogram.store().unwrap().get(".zattrs").unwrap().as_ref(), b"{\"a\":1}");
    assert_eq!(tomogram.levels().unwrap(), vec![0]);
}

#[test]
fn test_new_spacing_matching_static_alias_collides() {
    let project = Project::new();
    project.write_static("ExperimentRuns/TS_1/VoxelSpacing10.0/wbp.zarr/.zattrs", b"{}");
    let root = project.open();
    let run = root.get_run("TS_1").unwrap();
    assert!(matches!(
        run.new_voxel_spacing(10.0),
        Err(CopickError::NameCollision(_))
    ));
    run.new_voxel_spacing(13.48).unwrap();
    assert!(project
        .overlay_path("ExperimentRuns/TS_1/VoxelSpacing13.480")
        .is_dir());
}
