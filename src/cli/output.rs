//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::CopickError;

/// Map entity errors to a string for CLI output.
pub fn map_error(e: &CopickError) -> String {
    match e {
        CopickError::NotFound(what) => format!("not found: {}", what),
        CopickError::Config(msg) => format!("invalid configuration: {}", msg),
        other => other.to_string(),
    }
}
