//! Shared fixtures: a static root and an overlay root in one temporary directory

use copick::config::{CopickConfig, PickableObjectConfig};
use copick::Root;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that touch `COPICK__*` environment variables
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

pub struct Project {
    _dir: TempDir,
    pub static_root: PathBuf,
    pub overlay_root: PathBuf,
}

impl Project {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let static_root = dir.path().join("static");
        let overlay_root = dir.path().join("overlay");
        std::fs::create_dir_all(&static_root).unwrap();
        std::fs::create_dir_all(&overlay_root).unwrap();
        Self {
            _dir: dir,
            static_root,
            overlay_root,
        }
    }

    pub fn config(&self) -> CopickConfig {
        CopickConfig {
            name: Some("test project".to_string()),
            pickable_objects: vec![
                PickableObjectConfig::new("ribosome", true),
                PickableObjectConfig::new("membrane", false),
            ],
            overlay_root: Some(self.overlay_root.display().to_string()),
            static_root: Some(self.static_root.display().to_string()),
            ..CopickConfig::default()
        }
    }

    pub fn open(&self) -> Root {
        Root::from_config(self.config()).unwrap()
    }

    pub fn write_static(&self, relative: &str, data: &[u8]) {
        write_file(&self.static_root, relative, data);
    }

    pub fn write_overlay(&self, relative: &str, data: &[u8]) {
        write_file(&self.overlay_root, relative, data);
    }

    pub fn static_path(&self, relative: &str) -> PathBuf {
        self.static_root.join(relative)
    }

    pub fn overlay_path(&self, relative: &str) -> PathBuf {
        self.overlay_root.join(relative)
    }
}

fn write_file(root: &Path, relative: &str, data: &[u8]) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}

/// Minimal picks document
pub fn picks_json(object: &str, user: &str, session: &str, points: usize) -> Vec<u8> {
    let points: Vec<serde_json::Value> = (0..points)
        .map(|i| serde_json::json!({ "location": { "x": i as f64, "y": 0.0, "z": 0.0 } }))
        .collect();
    serde_json::to_vec(&serde_json::json!({
        "pickable_object_name": object,
        "user_id": user,
        "session_id": session,
        "points": points,
    }))
    .unwrap()
}
