//! Foreign files are skipped and reported, never fatal

use super::test_utils::{picks_json, Project};
use copick::overlay::Side;

#[test]
fn test_garbage_in_picks_directory() {
    let project = Project::new();
    project.write_static("ExperimentRuns/TS_1/Picks/alice_0_ribosome.json", &picks_json("ribosome", "alice", "0", 1));
    project.write_static("ExperimentRuns/TS_1/Picks/garbage.txt", b"not picks");
    let root = project.open();

    let picks = root.get_run("TS_1").unwrap().picks().unwrap();
    assert_eq!(picks.len(), 1);

    let diagnostics = root.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].side, Side::Static);
    assert_eq!(diagnostics[0].name, "garbage.txt");
    assert_eq!(diagnostics[0].kind, "picks");
    assert_eq!(diagnostics[0].path(), "ExperimentRuns/TS_1/Picks/garbage.txt");
}

#[test]
fn test_diagnostics_are_not_repeated() {
    let project = Project::new();
    project.write_overlay("ExperimentRuns/TS_1/Picks/garbage.txt", b"");
    let root = project.open();
    let run = root.get_run("TS_1").unwrap();
    for _ in 0..3 {
        assert!(run.picks().unwrap().is_empty());
        run.refresh();
    }
    assert_eq!(root.diagnostics().len(), 1);
    assert_eq!(root.diagnostics()[0].side, Side::Overlay);
}

#[test]
fn test_hidden_and_reserved_names_are_silent() {
    let project = Project::new();
    project.write_overlay("ExperimentRuns/.DS_Store", b"");
    project.write_overlay("ExperimentRuns/TS_1/Meshes/.hidden.glb", b"");
    project.write_overlay("ExperimentRuns/TS_1/VoxelSpacing5.000/wbp_cellpose_features.zarr/.zattrs", b"{}");
    let root = project.open();

    let runs = root.runs().unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert!(run.meshes().unwrap().is_empty());
    let spacing = run.get_voxel_spacing(5.0).unwrap();
    assert!(spacing.tomograms().unwrap().is_empty());
    assert_eq!(spacing.features().unwrap().len(), 1);
    assert!(root.diagnostics().is_empty());
}

#[test]
fn test_bad_spacing_directory_reported() {
    let project = Project::new();
    project.write_static("ExperimentRuns/TS_1/VoxelSpacingabc/wbp.zarr/.zattrs", b"{}");
    project.write_static("ExperimentRuns/TS_1/VoxelSpacing10.0/wbp.zarr/.zattrs", b"{}");
    let root = project.open();
    let spacings = root.get_run("TS_1").unwrap().voxel_spacings().unwrap();
    assert_eq!(spacings.len(), 1);
    assert_eq!(root.diagnostics()[0].name, "VoxelSpacingabc");
}
