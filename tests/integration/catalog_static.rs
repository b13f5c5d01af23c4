//! A remote catalog as the static half, a local directory as the overlay

use copick::backend::Backend;
use copick::catalog::{AnnotationFileRecord, InMemoryCatalog, RunRecord, TomogramRecord};
use copick::config::{ConfigType, CopickConfig, PickableObjectConfig};
use copick::{CopickError, Provenance, Root};
use std::sync::Arc;
use tempfile::TempDir;

const STORE: &str = "https://files.example.org/10301/TS_01/Reconstructions/VoxelSpacing13.480/Tomograms/100/TS_01.zarr";
const POINTS: &str = "https://files.example.org/10301/TS_01/Annotations/ribosome_orientedpoint.ndjson";

fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_run(RunRecord { id: 7, name: "TS_01".into(), dataset_id: 10301 })
        .with_tomogram(TomogramRecord {
            id: 100,
            run_id: 7,
            voxel_spacing: 13.48,
            reconstruction_method: "WBP".into(),
            processing: "raw".into(),
            https_omezarr_dir: STORE.into(),
        })
        .with_annotation_file(AnnotationFileRecord {
            id: 500,
            annotation_id: 88,
            run_id: 7,
            object_name: "cytosolic ribosome".into(),
            object_id: "GO:0022626".into(),
            shape_type: "OrientedPoint".into(),
            format: "ndjson".into(),
            https_path: POINTS.into(),
            voxel_spacing: 13.48,
        })
        .with_file(format!("{}/.zattrs", STORE), r#"{"multiscales":[{"datasets":[{"path":"0"},{"path":"1"},{"path":"2"}]}]}"#)
        .with_file(POINTS, "{\"type\":\"orientedPoint\",\"location\":{\"x\":10,\"y\":20,\"z\":30}}\n")
}

fn open(catalog: Arc<InMemoryCatalog>) -> (TempDir, Root) {
    let dir = TempDir::new().unwrap();
    let mut ribosome = PickableObjectConfig::new("ribosome", true);
    ribosome.identifier = Some("GO:0022626".into());
    let config = CopickConfig {
        config_type: ConfigType::CryoetDataPortal,
        dataset_ids: vec![10301],
        pickable_objects: vec![ribosome],
        overlay_root: Some(dir.path().display().to_string()),
        ..CopickConfig::default()
    };
    config.validate().unwrap();
    let root = Root::builder()
        .config(config)
        .catalog_client(catalog)
        .build()
        .unwrap();
    (dir, root)
}

#[test]
fn test_catalog_records_become_entities() {
    let (_dir, root) = open(Arc::new(catalog()));
    let runs = root.runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].name(), "TS_01");
    assert_eq!(runs[0].provenance(), Provenance::StaticOnly);

    let spacing = runs[0].get_voxel_spacing(13.48).unwrap();
    let tomogram = spacing.get_tomogram("wbp").unwrap();
    assert_eq!(tomogram.levels().unwrap(), vec![0, 1, 2]);

    let picks = runs[0].picks().unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0].user_id(), "data-portal");
    assert_eq!(picks[0].session_id(), "88");
    let points = picks[0].points().unwrap();
    assert!((points[0].location.x - 134.8).abs() < 1e-9);
    assert!(root.diagnostics().is_empty());
}

#[test]
fn test_writes_go_to_the_overlay() {
    let (dir, root) = open(Arc::new(catalog()));
    let run = root.get_run("TS_01").unwrap();
    run.new_picks("ribosome", "alice", "0").unwrap();
    assert!(dir.path().join("ExperimentRuns/TS_01/Picks/alice_0_ribosome.json").is_file());
    assert_eq!(run.picks().unwrap().len(), 2);

    assert!(matches!(
        run.delete_picks("ribosome", "data-portal", "88"),
        Err(CopickError::ReadOnlyViolation(_))
    ));
    assert!(!root.static_backend().unwrap().is_writable());
}

#[test]
fn test_catalog_picks_copy_up() {
    let (dir, root) = open(Arc::new(catalog()));
    let mut picks = root.get_run("TS_01").unwrap().picks().unwrap().remove(0);
    picks.copy_up().unwrap();
    let copied = dir
        .path()
        .join("ExperimentRuns/TS_01/Picks/data-portal_88_ribosome.json");
    let document: serde_json::Value = serde_json::from_slice(&std::fs::read(copied).unwrap()).unwrap();
    assert_eq!(document["pickable_object_name"], "ribosome");
    assert_eq!(document["points"].as_array().unwrap().len(), 1);
}

#[test]
fn test_catalog_is_queried_once_until_refresh() {
    let catalog = Arc::new(catalog());
    let (_dir, root) = open(Arc::clone(&catalog));
    root.runs().unwrap();
    root.get_run("TS_01").unwrap().voxel_spacings().unwrap();
    assert_eq!(catalog.run_queries(), 1);
    root.refresh();
    root.runs().unwrap();
    assert_eq!(catalog.run_queries(), 2);
}
