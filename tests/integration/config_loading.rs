//! Configuration files, environment overrides and validation

use super::test_utils::{Project, ENV_MUTEX};
use copick::config::{ConfigType, CopickConfig};
use copick::{ConfigLoader, CopickError, Root};
use tempfile::TempDir;

#[test]
fn test_open_from_saved_file() {
    let project = Project::new();
    project.write_static("ExperimentRuns/TS_1/Picks/alice_0_ribosome.json", b"{}");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("copick_config.json");
    project.config().save(&path).unwrap();

    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let root = Root::from_file(&path).unwrap();
    assert_eq!(root.config().pickable_objects.len(), 2);
    assert_eq!(root.runs().unwrap().len(), 1);
}

#[test]
fn test_environment_overrides_overlay_root() {
    let project = Project::new();
    let other = TempDir::new().unwrap();
    let dir = TempDir::new().unwrap();
    project.config().save(dir.path().join("copick_config.json")).unwrap();

    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    std::env::set_var("COPICK__OVERLAY_ROOT", other.path().display().to_string());
    let loaded = ConfigLoader::load(dir.path());
    std::env::remove_var("COPICK__OVERLAY_ROOT");

    let config = loaded.unwrap();
    assert_eq!(config.overlay_root, Some(other.path().display().to_string()));
    assert_eq!(config.config_type, ConfigType::Filesystem);
}

#[test]
fn test_project_file_format() {
    let config = ConfigLoader::load_from_str(
        r#"{
            "name": "demo",
            "version": "1.0.0",
            "pickable_objects": [
                {"name": "ribosome", "is_particle": true, "label": 1, "color": [0, 255, 0, 255], "radius": 150.0, "pdb_id": "7P6Z"},
                {"name": "membrane", "is_particle": false, "label": 2}
            ],
            "overlay_root": "/tmp/overlay",
            "static_root": "s3://bucket/static",
            "static_fs_args": {"region": "us-west-2"}
        }"#,
    )
    .unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.object("ribosome").unwrap().radius, Some(150.0));
    assert_eq!(config.static_fs_args["region"], "us-west-2");
}

#[test]
fn test_invalid_configs_are_rejected() {
    let duplicate = ConfigLoader::load_from_str(
        r#"{
            "overlay_root": "/tmp/overlay",
            "pickable_objects": [
                {"name": "ribosome", "is_particle": true, "label": 1},
                {"name": "ribosome", "is_particle": true, "label": 1}
            ]
        }"#,
    )
    .unwrap();
    let errors = duplicate.validate().unwrap_err();
    assert!(errors.len() >= 2);

    let portal = CopickConfig {
        config_type: ConfigType::CryoetDataPortal,
        overlay_root: Some("/tmp/overlay".into()),
        ..CopickConfig::default()
    };
    assert!(matches!(Root::from_config(portal), Err(CopickError::Config(_))));

    let missing = Root::from_file("/nonexistent/copick_config.json");
    assert!(missing.is_err());
}
