//! Project config file source: the JSON `copick_config.json` document.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::{File, FileFormat};
use std::path::Path;

/// Add the project file to the builder. The file is required.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Ok(builder.add_source(File::from(canonical).format(FileFormat::Json).required(true)))
}

/// Add an in-memory JSON document to the builder.
pub fn add_str_to_builder(
    builder: ConfigBuilder<DefaultState>,
    json: &str,
) -> ConfigBuilder<DefaultState> {
    builder.add_source(File::from_str(json, FileFormat::Json))
}
