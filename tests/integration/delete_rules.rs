//! Deletes only ever touch the overlay

use super::test_utils::{picks_json, Project};
use copick::{CopickError, Provenance};

const STATIC_PICKS: &str = "ExperimentRuns/TS_1/Picks/alice_0_ribosome.json";

#[test]
fn test_delete_static_only_is_rejected() {
    let project = Project::new();
    project.write_static(STATIC_PICKS, &picks_json("ribosome", "alice", "0", 1));
    let root = project.open();
    let run = root.get_run("TS_1").unwrap();
    assert!(matches!(
        run.delete_picks("ribosome", "alice", "0"),
        Err(CopickError::ReadOnlyViolation(_))
    ));
    assert!(project.static_path(STATIC_PICKS).is_file());
}

#[test]
fn test_delete_both_resurfaces_static_copy() {
    let project = Project::new();
    project.write_static(STATIC_PICKS, &picks_json("ribosome", "alice", "0", 1));
    project.write_overlay(STATIC_PICKS, &picks_json("ribosome", "alice", "0", 5));
    let root = project.open();
    let run = root.get_run("TS_1").unwrap();

    let picks = run.picks().unwrap();
    assert_eq!(picks[0].provenance(), Provenance::Both);
    assert_eq!(picks[0].points().unwrap().len(), 5);

    run.delete_picks("ribosome", "alice", "0").unwrap();
    let picks = run.picks().unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0].provenance(), Provenance::StaticOnly);
    assert_eq!(picks[0].points().unwrap().len(), 1);
    assert!(!project.overlay_path(STATIC_PICKS).exists());
}

#[test]
fn test_delete_overlay_only_and_missing() {
    let project = Project::new();
    let root = project.open();
    let run = root.new_run("TS_1").unwrap();
    run.new_mesh("membrane", "alice", "0", b"glTF").unwrap();
    run.delete_mesh("membrane", "alice", "0").unwrap();
    assert!(run.meshes().unwrap().is_empty());
    assert!(matches!(
        run.delete_mesh("membrane", "alice", "0"),
        Err(CopickError::NotFound(_))
    ));
}

#[test]
fn test_deleted_mesh_is_not_recreated_by_old_handle() {
    let project = Project::new();
    let root = project.open();
    let run = root.new_run("TS_1").unwrap();
    let mesh = run.new_mesh("membrane", "alice", "0", b"glTF").unwrap();
    run.delete_mesh("membrane", "alice", "0").unwrap();

    assert!(matches!(mesh.store(b"glTF2"), Err(CopickError::NotFound(_))));
    assert!(!project
        .overlay_path("ExperimentRuns/TS_1/Meshes/alice_0_membrane.glb")
        .exists());
    root.refresh();
    assert!(run.meshes().unwrap().is_empty());
}

#[test]
fn test_delete_run_with_static_half() {
    let project = Project::new();
    project.write_static(STATIC_PICKS, &picks_json("ribosome", "alice", "0", 1));
    let root = project.open();
    root.get_run("TS_1")
        .unwrap()
        .new_picks("ribosome", "bob", "1")
        .unwrap();
    assert_eq!(root.get_run("TS_1").unwrap().provenance(), Provenance::Both);

    root.delete_run("TS_1").unwrap();
    let run = root.get_run("TS_1").unwrap();
    assert_eq!(run.provenance(), Provenance::StaticOnly);
    assert_eq!(run.picks().unwrap().len(), 1);
}
