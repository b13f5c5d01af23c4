//! Opaque random-access store handles
//!
//! Multiscale volumes (tomograms, features, segmentations, object references)
//! are key/value stores rooted at a directory. Array codecs live above this
//! layer; the handle only moves bytes.

use crate::backend::{join_path, Backend};
use crate::error::CopickError;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Handle to a store rooted at `root` inside one backend
#[derive(Clone)]
pub struct StoreHandle {
    backend: Arc<dyn Backend>,
    root: String,
    writable: bool,
}

impl StoreHandle {
    pub fn new(backend: Arc<dyn Backend>, root: impl Into<String>, writable: bool) -> Self {
        Self {
            backend,
            root: root.into(),
            writable,
        }
    }

    /// Path of the store inside its backend
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Name of the backend the store lives in
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Handle to a sub-store (e.g. one multiscale level)
    pub fn child(&self, key: &str) -> StoreHandle {
        StoreHandle {
            backend: Arc::clone(&self.backend),
            root: join_path(&[&self.root, key]),
            writable: self.writable,
        }
    }

    pub fn get(&self, key: &str) -> Result<Bytes, CopickError> {
        Ok(self.backend.get(&join_path(&[&self.root, key]))?)
    }

    /// Read `len` bytes at `offset` of one store key
    pub fn get_range(&self, key: &str, offset: u64, len: usize) -> Result<Bytes, CopickError> {
        Ok(self
            .backend
            .get_range(&join_path(&[&self.root, key]), offset, len)?)
    }

    pub fn contains(&self, key: &str) -> Result<bool, CopickError> {
        Ok(self.backend.exists(&join_path(&[&self.root, key]))?)
    }

    pub fn put(&self, key: &str, data: &[u8]) -> Result<(), CopickError> {
        self.check_writable()?;
        Ok(self.backend.put(&join_path(&[&self.root, key]), data)?)
    }

    pub fn delete(&self, key: &str) -> Result<(), CopickError> {
        self.check_writable()?;
        Ok(self.backend.delete(&join_path(&[&self.root, key]))?)
    }

    /// Immediate child names of a key inside the store
    pub fn list(&self, key: &str) -> Result<BTreeSet<String>, CopickError> {
        Ok(self.backend.list(&join_path(&[&self.root, key]))?)
    }

    /// Every file key in the store, relative to its root, sorted
    pub fn keys(&self) -> Result<Vec<String>, CopickError> {
        let prefix_len = if self.root.is_empty() {
            0
        } else {
            self.root.len() + 1
        };
        Ok(self
            .backend
            .walk(&self.root)?
            .into_iter()
            .filter(|path| path.len() > prefix_len)
            .map(|path| path[prefix_len..].to_string())
            .collect())
    }

    fn check_writable(&self) -> Result<(), CopickError> {
        if self.writable {
            Ok(())
        } else {
            Err(CopickError::ReadOnlyViolation(format!(
                "store '{}' on {} is read-only",
                self.root,
                self.backend.name()
            )))
        }
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("backend", &self.backend.name())
            .field("root", &self.root)
            .field("writable", &self.writable)
            .finish()
    }
}
