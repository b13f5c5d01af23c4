//! Error types for the copick overlay entity tree.

use thiserror::Error;

/// Backend-level errors
///
/// Raised by a [`Backend`](crate::backend::Backend) implementation. Never retried here.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Backend '{backend}' unavailable: {reason}")]
    Unavailable { backend: String, reason: String },

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Backend '{0}' is read-only")]
    ReadOnly(String),

    #[error("Backend I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    pub fn unavailable(backend: impl Into<String>, reason: impl ToString) -> Self {
        BackendError::Unavailable {
            backend: backend.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by the entity API
#[derive(Debug, Error)]
pub enum CopickError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Read-only violation: {0}")]
    ReadOnlyViolation(String),

    #[error("Name collision: {0}")]
    NameCollision(String),

    #[error("Invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<BackendError> for CopickError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(path) => CopickError::NotFound(path),
            BackendError::ReadOnly(backend) => {
                CopickError::ReadOnlyViolation(format!("backend '{}' does not accept writes", backend))
            }
            other => CopickError::BackendUnavailable(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for CopickError {
    fn from(err: config::ConfigError) -> Self {
        CopickError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for CopickError {
    fn from(err: serde_json::Error) -> Self {
        CopickError::Serialization(err.to_string())
    }
}

/// Key codec errors
///
/// Raised when a key component is illegal at creation time, or when a raw
/// storage name cannot be decoded (the latter only ever reaches the diagnostics channel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("{component} must not be empty")]
    Empty { component: &'static str },

    #[error("{component} '{value}' contains reserved character '{ch}'")]
    ReservedChar {
        component: &'static str,
        value: String,
        ch: char,
    },

    #[error("{component} '{value}' is not allowed: {reason}")]
    Illegal {
        component: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("Invalid voxel spacing: {0}")]
    InvalidSpacing(String),

    #[error("Cannot decode '{name}': {reason}")]
    Undecodable { name: String, reason: String },
}

impl KeyError {
    pub(crate) fn undecodable(name: &str, reason: impl Into<String>) -> Self {
        KeyError::Undecodable {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
