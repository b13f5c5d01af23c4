//! Layered configuration loading.
//!
//! Precedence (lowest to highest): built-in defaults, the JSON project file,
//! `COPICK__*` environment variables.

use super::merge::merge_policy;
use super::sources::{environment, project_file};
use super::{CopickConfig, CONFIG_FILE_NAME};
use config::ConfigError;
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load `copick_config.json` from a project directory
    pub fn load(project_dir: &Path) -> Result<CopickConfig, ConfigError> {
        Self::load_from_file(&project_dir.join(CONFIG_FILE_NAME))
    }

    /// Load a specific JSON config file
    pub fn load_from_file(path: &Path) -> Result<CopickConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = project_file::add_to_builder(builder, path)?;
        let builder = environment::add_to_builder(builder);
        let config: CopickConfig = builder.build()?.try_deserialize()?;
        debug!(
            path = %path.display(),
            objects = config.pickable_objects.len(),
            config_type = ?config.config_type,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Load from an in-memory JSON document (no environment layer)
    pub fn load_from_str(json: &str) -> Result<CopickConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        project_file::add_str_to_builder(builder, json)
            .build()?
            .try_deserialize()
    }

    /// Defaults only
    pub fn default() -> CopickConfig {
        CopickConfig::default()
    }
}
