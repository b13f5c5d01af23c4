//! Static entities are read-only until copied up to the overlay

use super::test_utils::{picks_json, Project};
use bytes::Bytes;
use copick::entity::CopickPoint;
use copick::{CopickError, Provenance};

fn project_with_static_tomogram() -> Project {
    let project = Project::new();
    project.write_static("ExperimentRuns/TS_1/VoxelSpacing10.000/wbp.zarr/.zattrs", b"{}");
    project.write_static("ExperimentRuns/TS_1/VoxelSpacing10.000/wbp.zarr/0/.zarray", b"{}");
    project.write_static("ExperimentRuns/TS_1/VoxelSpacing10.000/wbp.zarr/0/0.0.0", b"chunk");
    project.write_static(
        "ExperimentRuns/TS_1/Picks/curator_0_ribosome.json",
        &picks_json("ribosome", "curator", "0", 2),
    );
    project
}

#[test]
fn test_features_on_static_tomogram_need_copy_up() {
    let project = project_with_static_tomogram();
    let root = project.open();
    let mut tomogram = root
        .get_run("TS_1")
        .unwrap()
        .get_voxel_spacing(10.0)
        .unwrap()
        .get_tomogram("wbp")
        .unwrap();
    assert_eq!(tomogram.provenance(), Provenance::StaticOnly);
    assert!(matches!(
        tomogram.new_features("sobel", vec![]),
        Err(CopickError::ReadOnlyViolation(_))
    ));

    tomogram.copy_up().unwrap();
    tomogram
        .new_features("sobel", vec![(".zattrs".to_string(), Bytes::from_static(b"{}"))])
        .unwrap();

    let spacing_dir = "ExperimentRuns/TS_1/VoxelSpacing10.000";
    assert!(project
        .overlay_path(&format!("{}/wbp.zarr/0/0.0.0", spacing_dir))
        .is_file());
    assert!(project
        .overlay_path(&format!("{}/wbp_sobel_features.zarr/.zattrs", spacing_dir))
        .is_file());
    assert!(!project
        .static_path(&format!("{}/wbp_sobel_features.zarr", spacing_dir))
        .exists());
}

#[test]
fn test_static_picks_write_after_copy_up() {
    let project = project_with_static_tomogram();
    let root = project.open();
    let run = root.get_run("TS_1").unwrap();
    let mut picks = run.picks().unwrap().remove(0);
    assert_eq!(picks.points().unwrap().len(), 2);
    assert!(matches!(
        picks.store(&[CopickPoint::new(0.0, 0.0, 0.0)]),
        Err(CopickError::ReadOnlyViolation(_))
    ));

    picks.copy_up().unwrap();
    picks.store(&[CopickPoint::new(9.0, 9.0, 9.0)]).unwrap();
    assert_eq!(picks.provenance(), Provenance::Both);

    // the overlay copy now shadows the static document
    let reread = root.get_run("TS_1").unwrap().picks().unwrap().remove(0);
    assert_eq!(reread.points().unwrap().len(), 1);
    let original = std::fs::read(project.static_path("ExperimentRuns/TS_1/Picks/curator_0_ribosome.json")).unwrap();
    assert_eq!(original, picks_json("ribosome", "curator", "0", 2));
}

#[test]
fn test_interrupted_copy_up_leaves_no_entity() {
    let project = project_with_static_tomogram();
    project.write_overlay(
        "ExperimentRuns/TS_1/VoxelSpacing10.000/.staging-wbp.zarr/.zattrs",
        b"partial",
    );
    let root = project.open();
    let spacing = root.get_run("TS_1").unwrap().get_voxel_spacing(10.0).unwrap();
    let tomograms = spacing.tomograms().unwrap();
    assert_eq!(tomograms.len(), 1);
    assert_eq!(tomograms[0].provenance(), Provenance::StaticOnly);
    assert!(root.diagnostics().is_empty());

    let mut tomogram = tomograms.into_iter().next().unwrap();
    tomogram.copy_up().unwrap();
    assert!(!project
        .overlay_path("ExperimentRuns/TS_1/VoxelSpacing10.000/.staging-wbp.zarr")
        .exists());
    assert_eq!(
        std::fs::read(project.overlay_path("ExperimentRuns/TS_1/VoxelSpacing10.000/wbp.zarr/.zattrs")).unwrap(),
        b"{}"
    );
}

#[test]
fn test_copy_up_through_second_handle_keeps_overlay_edits() {
    let project = project_with_static_tomogram();
    let root = project.open();
    let run = root.get_run("TS_1").unwrap();
    let mut first = run.picks().unwrap().remove(0);
    let mut second = run.picks().unwrap().remove(0);

    first.copy_up().unwrap();
    let edited = vec![CopickPoint::new(1.0, 1.0, 1.0); 3];
    first.store(&edited).unwrap();

    second.copy_up().unwrap();
    assert_eq!(second.provenance(), Provenance::Both);
    assert_eq!(second.points().unwrap().len(), 3);
    let reread = root.get_run("TS_1").unwrap().picks().unwrap().remove(0);
    assert_eq!(reread.points().unwrap().len(), 3);
}

#[test]
fn test_stale_handle_writes_after_copy_up_elsewhere() {
    let project = project_with_static_tomogram();
    let root = project.open();
    let run = root.get_run("TS_1").unwrap();
    let mut first = run.picks().unwrap().remove(0);
    let second = run.picks().unwrap().remove(0);

    first.copy_up().unwrap();
    assert_eq!(second.provenance(), Provenance::StaticOnly);
    second.store(&[CopickPoint::new(4.0, 4.0, 4.0)]).unwrap();
    assert_eq!(first.points().unwrap().len(), 1);
    let original = std::fs::read(project.static_path("ExperimentRuns/TS_1/Picks/curator_0_ribosome.json")).unwrap();
    assert_eq!(original, picks_json("ribosome", "curator", "0", 2));
}
