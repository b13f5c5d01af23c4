//! Backend Provider
//!
//! Uniform, synchronous byte and listing operations over one physical storage
//! location. Every entity read or write ends up here; the merge engine only ever
//! talks to a pair of `Backend` trait objects.
//!
//! Paths are `/`-separated and relative to the backend root. Leading and
//! trailing slashes are ignored.

use crate::error::BackendError;
use bytes::Bytes;
use std::collections::BTreeSet;

pub mod local;
pub mod memory;
pub mod registry;
pub mod s3;
pub mod store;

pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use registry::{BackendFactory, BackendRegistry, FsArgs};
pub use s3::S3Backend;
pub use store::StoreHandle;

/// Storage capability set shared by every backend variant
pub trait Backend: Send + Sync {
    /// Human-readable identifier, e.g. `file:///data/overlay` (logging and errors)
    fn name(&self) -> &str;

    /// Whether `put`/`delete`/`makedirs`/`rename` are supported
    fn is_writable(&self) -> bool {
        true
    }

    fn exists(&self, path: &str) -> Result<bool, BackendError>;

    /// Immediate child names under `prefix`, files and directories alike.
    ///
    /// A prefix that does not exist yields an empty set.
    fn list(&self, prefix: &str) -> Result<BTreeSet<String>, BackendError>;

    fn get(&self, path: &str) -> Result<Bytes, BackendError>;

    /// Read `len` bytes starting at `offset`.
    fn get_range(&self, path: &str, offset: u64, len: usize) -> Result<Bytes, BackendError> {
        let data = self.get(path)?;
        slice_range(path, &data, offset, len)
    }

    /// Write a whole file. Parent directories are created as needed.
    fn put(&self, path: &str, data: &[u8]) -> Result<(), BackendError>;

    /// Remove a file or a whole subtree.
    fn delete(&self, path: &str) -> Result<(), BackendError>;

    fn makedirs(&self, path: &str) -> Result<(), BackendError>;

    /// Move a file or subtree, replacing whatever is at `to`.
    fn rename(&self, from: &str, to: &str) -> Result<(), BackendError>;

    /// All file paths under `prefix` (relative to the backend root), sorted.
    fn walk(&self, prefix: &str) -> Result<Vec<String>, BackendError>;

    /// Drop any listing state the backend keeps internally.
    fn refresh(&self) {}
}

/// Join path segments with `/`, skipping empty segments
pub fn join_path(parts: &[&str]) -> String {
    let mut out = String::new();
    for part in parts {
        let part = clean_path(part);
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

/// Strip leading and trailing separators
pub fn clean_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// Last segment of a path
pub fn file_name(path: &str) -> &str {
    let path = clean_path(path);
    path.rsplit('/').next().unwrap_or(path)
}

pub(crate) fn slice_range(
    path: &str,
    data: &Bytes,
    offset: u64,
    len: usize,
) -> Result<Bytes, BackendError> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let end = start.saturating_add(len);
    if end > data.len() {
        return Err(BackendError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            format!(
                "Range out of bounds for {}: requested {} bytes at offset {}, size is {}",
                path,
                len,
                offset,
                data.len()
            ),
        )));
    }
    Ok(data.slice(start..end))
}
