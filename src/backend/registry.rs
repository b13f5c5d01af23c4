//! Backend registry: URI scheme to backend factory.
//!
//! `file` (alias `local`), `memory` and `s3` are registered by default. Anything else
//! (e.g. `ssh`, `smb`) must be provided through [`BackendRegistry::register_backend`].

use crate::backend::{Backend, LocalBackend, MemoryBackend, S3Backend};
use crate::error::BackendError;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Backend-specific connection arguments, passed through untouched
pub type FsArgs = serde_json::Map<String, serde_json::Value>;

/// Builds a backend from a parsed URI and its fs arguments
pub type BackendFactory =
    Arc<dyn Fn(&Url, &FsArgs) -> Result<Arc<dyn Backend>, BackendError> + Send + Sync>;

pub struct BackendRegistry {
    factories: RwLock<HashMap<String, BackendFactory>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendRegistry {
    /// Create a registry with the built-in schemes
    pub fn new() -> Self {
        let registry = Self::empty();

        let local: BackendFactory =
            Arc::new(|url: &Url, _args: &FsArgs| -> Result<Arc<dyn Backend>, BackendError> {
                let path = url.to_file_path().map_err(|_| {
                    BackendError::unavailable(url.as_str(), "not a valid local path")
                })?;
                Ok(Arc::new(LocalBackend::new(path)) as Arc<dyn Backend>)
            });
        registry.register_backend("file", Arc::clone(&local));
        registry.register_backend("local", local);

        let memory: Arc<Mutex<HashMap<String, Arc<MemoryBackend>>>> = Arc::default();
        registry.register_backend(
            "memory",
            Arc::new(move |url: &Url, _args: &FsArgs| -> Result<Arc<dyn Backend>, BackendError> {
                let name = format!("{}{}", url.host_str().unwrap_or(""), url.path());
                let backend = memory
                    .lock()
                    .entry(name.clone())
                    .or_insert_with(|| Arc::new(MemoryBackend::new(name)))
                    .clone();
                Ok(backend as Arc<dyn Backend>)
            }),
        );

        registry.register_backend(
            "s3",
            Arc::new(|url: &Url, args: &FsArgs| -> Result<Arc<dyn Backend>, BackendError> {
                let bucket = url
                    .host_str()
                    .ok_or_else(|| BackendError::unavailable(url.as_str(), "missing bucket"))?;
                let backend = S3Backend::connect(bucket, url.path(), args)?;
                Ok(Arc::new(backend) as Arc<dyn Backend>)
            }),
        );

        registry
    }

    /// Create a registry with no schemes at all
    pub fn empty() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the factory for a URI scheme
    pub fn register_backend(&self, scheme: &str, factory: BackendFactory) {
        debug!(scheme, "Registered backend factory");
        self.factories
            .write()
            .insert(scheme.to_ascii_lowercase(), factory);
    }

    pub fn schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self.factories.read().keys().cloned().collect();
        schemes.sort();
        schemes
    }

    /// Open a backend for `uri`
    ///
    /// A URI without a scheme is treated as a local path.
    pub fn open(&self, uri: &str, fs_args: &FsArgs) -> Result<Arc<dyn Backend>, BackendError> {
        let url = parse_uri(uri)?;
        let factory = self
            .factories
            .read()
            .get(url.scheme())
            .cloned()
            .ok_or_else(|| {
                BackendError::unavailable(
                    uri,
                    format!("no backend registered for scheme '{}'", url.scheme()),
                )
            })?;
        debug!(uri, scheme = url.scheme(), "Opening backend");
        factory(&url, fs_args)
    }
}

fn parse_uri(uri: &str) -> Result<Url, BackendError> {
    if !uri.contains("://") {
        let path = std::path::Path::new(uri);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| BackendError::unavailable(uri, e))?
                .join(path)
        };
        return Url::from_file_path(&absolute)
            .map_err(|_| BackendError::unavailable(uri, "not a valid local path"));
    }
    Url::parse(uri).map_err(|e| BackendError::unavailable(uri, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_schemes() {
        let registry = BackendRegistry::new();
        assert_eq!(registry.schemes(), vec!["file", "local", "memory", "s3"]);
    }

    #[test]
    fn test_open_bare_path_and_file_uri() {
        let temp_dir = TempDir::new().unwrap();
        let registry = BackendRegistry::new();
        let args = FsArgs::new();

        let a = registry.open(temp_dir.path().to_str().unwrap(), &args).unwrap();
        a.put("x.txt", b"1").unwrap();

        let uri = Url::from_file_path(temp_dir.path()).unwrap();
        let b = registry.open(uri.as_str(), &args).unwrap();
        assert!(b.exists("x.txt").unwrap());
    }

    #[test]
    fn test_memory_backends_shared_by_name() {
        let registry = BackendRegistry::new();
        let args = FsArgs::new();
        let a = registry.open("memory://project", &args).unwrap();
        let b = registry.open("memory://project", &args).unwrap();
        let c = registry.open("memory://other", &args).unwrap();

        a.put("k", b"v").unwrap();
        assert!(b.exists("k").unwrap());
        assert!(!c.exists("k").unwrap());
    }

    #[test]
    fn test_unknown_scheme_is_unavailable() {
        let registry = BackendRegistry::new();
        match registry.open("ssh://host/data", &FsArgs::new()) {
            Err(BackendError::Unavailable { reason, .. }) => assert!(reason.contains("ssh")),
            other => panic!("Expected Unavailable, got {:?}", other.map(|b| b.name().to_string())),
        }
    }

    #[test]
    fn test_register_custom_scheme() {
        let registry = BackendRegistry::new();
        registry.register_backend(
            "smb",
            Arc::new(|url: &Url, args: &FsArgs| -> Result<Arc<dyn Backend>, BackendError> {
                assert_eq!(args.get("username").and_then(|v| v.as_str()), Some("me"));
                Ok(Arc::new(MemoryBackend::new(url.host_str().unwrap_or("smb"))) as Arc<dyn Backend>)
            }),
        );

        let mut args = FsArgs::new();
        args.insert("username".to_string(), serde_json::json!("me"));
        let backend = registry.open("smb://fileserver/share", &args).unwrap();
        assert_eq!(backend.name(), "memory://fileserver");
    }
}
