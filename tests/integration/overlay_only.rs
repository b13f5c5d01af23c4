//! A project with only an overlay root

use copick::config::{CopickConfig, PickableObjectConfig};
use copick::entity::CopickPoint;
use copick::{Provenance, Root};
use tempfile::TempDir;

fn overlay_root() -> (TempDir, Root) {
    let dir = TempDir::new().unwrap();
    let config = CopickConfig {
        pickable_objects: vec![PickableObjectConfig::new("ribosome", true)],
        overlay_root: Some(dir.path().display().to_string()),
        ..CopickConfig::default()
    };
    let root = Root::from_config(config).unwrap();
    (dir, root)
}

#[test]
fn test_create_run_spacing_and_picks() {
    let (dir, root) = overlay_root();
    assert!(root.static_backend().is_none());

    let run = root.new_run("TS_1").unwrap();
    run.new_voxel_spacing(10.0).unwrap();
    run.new_picks("ribosome", "user1", "0").unwrap();

    assert!(dir
        .path()
        .join("ExperimentRuns/TS_1/Picks/user1_0_ribosome.json")
        .is_file());
    assert!(dir.path().join("ExperimentRuns/TS_1/VoxelSpacing10.000").is_dir());

    let picks = run.picks().unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0].object_name(), "ribosome");
    assert_eq!(picks[0].provenance(), Provenance::OverlayOnly);
}

#[test]
fn test_points_round_trip_through_disk() {
    let (_dir, root) = overlay_root();
    let run = root.new_run("TS_1").unwrap();
    let picks = run.new_picks("ribosome", "user1", "0").unwrap();

    picks
        .store(&[CopickPoint::new(1.0, 2.0, 3.0), CopickPoint::new(4.0, 5.0, 6.0)])
        .unwrap();

    let reopened = root.get_run("TS_1").unwrap().picks().unwrap();
    let document = reopened[0].load().unwrap();
    assert_eq!(document.points.len(), 2);
    assert_eq!(document.run_name.as_deref(), Some("TS_1"));
    assert_eq!(document.points[1].location.y, 5.0);
}

#[test]
fn test_tomogram_store_is_atomic() {
    let (dir, root) = overlay_root();
    let spacing = root.new_run("TS_1").unwrap().new_voxel_spacing(7.84).unwrap();
    spacing
        .new_tomogram(
            "wbp",
            vec![
                (".zattrs".to_string(), bytes::Bytes::from_static(b"{}")),
                ("0/.zarray".to_string(), bytes::Bytes::from_static(b"{}")),
            ],
        )
        .unwrap();

    let spacing_dir = dir.path().join("ExperimentRuns/TS_1/VoxelSpacing7.840");
    let names: Vec<String> = std::fs::read_dir(&spacing_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["wbp.zarr"]);

    let tomogram = spacing.get_tomogram("wbp").unwrap();
    assert_eq!(tomogram.levels().unwrap(), vec![0]);
    assert!(tomogram.store().unwrap().is_writable());
}
