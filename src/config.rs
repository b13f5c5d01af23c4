//! Configuration System
//!
//! The project configuration document (`copick_config.json`): which backends hold the
//! static and overlay halves of the project, and the pickable objects annotated in it.
//! Loaded through layered sources (defaults, the JSON file, `COPICK__*` environment
//! overrides) and validated before a Root is built from it.

use crate::backend::FsArgs;
use crate::codec::validate_component;
use crate::error::CopickError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

mod loader;
mod merge;
mod sources;

pub use loader::ConfigLoader;

/// Conventional file name of the project configuration
pub const CONFIG_FILE_NAME: &str = "copick_config.json";

/// Backend variant of the static half
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigType {
    /// Static and overlay roots are storage URIs
    #[default]
    Filesystem,
    /// Static side is synthesised from the CryoET Data Portal catalog
    CryoetDataPortal,
}

/// Definition of an annotatable object type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickableObjectConfig {
    pub name: String,

    #[serde(default)]
    pub is_particle: bool,

    /// Integer label used in multilabel segmentations
    #[serde(default)]
    pub label: Option<i64>,

    /// RGBA, 0-255 per component
    #[serde(default)]
    pub color: Option<Vec<u8>>,

    /// Particle radius in angstrom
    #[serde(default)]
    pub radius: Option<f64>,

    /// Ontology identifier (e.g. `GO:0022626`), matched against catalog annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdb_id: Option<String>,

    /// Iso-surface threshold for the reference volume
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_threshold: Option<f64>,
}

/// Root configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopickConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub config_type: ConfigType,

    #[serde(default)]
    pub pickable_objects: Vec<PickableObjectConfig>,

    #[serde(default)]
    pub overlay_root: Option<String>,

    #[serde(default)]
    pub overlay_fs_args: FsArgs,

    #[serde(default)]
    pub static_root: Option<String>,

    #[serde(default)]
    pub static_fs_args: FsArgs,

    /// Catalog datasets exposed as the static side (`cryoet_data_portal` only)
    #[serde(default)]
    pub dataset_ids: Vec<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Object(String, String),
    Project(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Object(name, msg) => {
                write!(f, "Pickable object '{}': {}", name, msg)
            }
            ValidationError::Project(msg) => {
                write!(f, "Project: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl PickableObjectConfig {
    pub fn new(name: impl Into<String>, is_particle: bool) -> Self {
        Self {
            name: name.into(),
            is_particle,
            label: None,
            color: None,
            radius: None,
            identifier: None,
            pdb_id: None,
            map_threshold: None,
        }
    }

    /// Validate a single object definition
    pub fn validate(&self) -> Result<(), String> {
        validate_component("object_name", &self.name, false).map_err(|e| e.to_string())?;

        if let Some(color) = &self.color {
            if color.len() != 4 {
                return Err(format!(
                    "color must have 4 components (RGBA), found {}",
                    color.len()
                ));
            }
        }

        if let Some(radius) = self.radius {
            if !radius.is_finite() || radius < 0.0 {
                return Err(format!("radius must be a non-negative number, got {}", radius));
            }
        }

        Ok(())
    }
}

impl CopickConfig {
    /// Load from a JSON file with environment overrides applied
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CopickError> {
        Ok(ConfigLoader::load_from_file(path.as_ref())?)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for object in &self.pickable_objects {
            if let Err(e) = object.validate() {
                errors.push(ValidationError::Object(object.name.clone(), e));
            }
        }

        // Duplicate names and labels
        let mut names = HashMap::new();
        let mut labels = HashMap::new();
        for object in &self.pickable_objects {
            if names.insert(object.name.as_str(), ()).is_some() {
                errors.push(ValidationError::Object(
                    object.name.clone(),
                    "duplicate object name".to_string(),
                ));
            }
            if let Some(label) = object.label {
                if let Some(existing) = labels.insert(label, object.name.as_str()) {
                    errors.push(ValidationError::Object(
                        object.name.clone(),
                        format!("duplicate label {} (also used by '{}')", label, existing),
                    ));
                }
            }
        }

        match self.config_type {
            ConfigType::Filesystem => {
                if self.overlay_root.is_none() {
                    errors.push(ValidationError::Project(
                        "overlay_root is required for the filesystem config type".to_string(),
                    ));
                }
            }
            ConfigType::CryoetDataPortal => {
                if self.dataset_ids.is_empty() {
                    errors.push(ValidationError::Project(
                        "dataset_ids is required for the cryoet_data_portal config type"
                            .to_string(),
                    ));
                }
            }
        }

        if self.overlay_root.as_deref().map(str::trim) == Some("") {
            errors.push(ValidationError::Project("overlay_root is empty".to_string()));
        }
        if self.static_root.as_deref().map(str::trim) == Some("") {
            errors.push(ValidationError::Project("static_root is empty".to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Look up an object definition by name
    pub fn object(&self, name: &str) -> Option<&PickableObjectConfig> {
        self.pickable_objects.iter().find(|o| o.name == name)
    }

    /// Write the document as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CopickError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CopickError::Config(format!("Failed to create {:?}: {}", parent, e))
                })?;
            }
        }
        std::fs::write(path, json)
            .map_err(|e| CopickError::Config(format!("Failed to write {:?}: {}", path, e)))
    }
}

/// Join validation errors into one configuration error
pub(crate) fn validation_failure(errors: &[ValidationError]) -> CopickError {
    let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    CopickError::Config(format!(
        "Configuration validation failed:\n{}",
        messages.join("\n")
    ))
}
