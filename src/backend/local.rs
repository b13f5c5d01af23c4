//! Local filesystem backend

use crate::backend::{clean_path, Backend};
use crate::error::BackendError;
use bytes::Bytes;
use std::collections::BTreeSet;
use std::fs;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Backend rooted at a local directory
///
/// Writes go to a hidden temporary sibling first and are renamed into place,
/// so a reader never observes a half-written file.
pub struct LocalBackend {
    root: PathBuf,
    name: String,
}

impl LocalBackend {
    /// Create a backend rooted at `root`
    ///
    /// The root does not have to exist yet; it is created on first write.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        let root = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let name = format!("file://{}", root.display());
        Self { root, name }
    }

    /// Get the root path of this backend
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, BackendError> {
        let relative = Path::new(clean_path(path));
        for component in relative.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(BackendError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Path escapes backend root: {}", path),
                )));
            }
        }
        Ok(self.root.join(relative))
    }

    fn relative(&self, full: &Path) -> Option<String> {
        let rel = full.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

fn io_context(err: std::io::Error, action: &str, path: &Path) -> BackendError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return BackendError::NotFound(path.display().to_string());
    }
    BackendError::Io(std::io::Error::new(
        err.kind(),
        format!("Failed to {} {:?}: {}", action, path, err),
    ))
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, path: &str) -> Result<bool, BackendError> {
        let full = self.resolve(path)?;
        full.try_exists().map_err(|e| io_context(e, "stat", &full))
    }

    fn list(&self, prefix: &str) -> Result<BTreeSet<String>, BackendError> {
        let dir = self.resolve(prefix)?;
        if !dir.is_dir() {
            return Ok(BTreeSet::new());
        }
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => return Err(io_context(e, "list", &dir)),
        };

        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_context(e, "list", &dir))?;
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
        debug!(backend = %self.name, prefix, count = names.len(), "Listed prefix");
        Ok(names)
    }

    fn get(&self, path: &str) -> Result<Bytes, BackendError> {
        let full = self.resolve(path)?;
        let data = fs::read(&full).map_err(|e| io_context(e, "read", &full))?;
        Ok(Bytes::from(data))
    }

    fn get_range(&self, path: &str, offset: u64, len: usize) -> Result<Bytes, BackendError> {
        let full = self.resolve(path)?;
        let mut file = fs::File::open(&full).map_err(|e| io_context(e, "open", &full))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| io_context(e, "seek", &full))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .map_err(|e| io_context(e, "read range of", &full))?;
        Ok(Bytes::from(buf))
    }

    fn put(&self, path: &str, data: &[u8]) -> Result<(), BackendError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| io_context(e, "create directory", parent))?;
        }

        let file_name = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = full.with_file_name(format!(".{}.tmp-{}", file_name, std::process::id()));

        fs::write(&temp_path, data).map_err(|e| io_context(e, "write", &temp_path))?;
        fs::rename(&temp_path, &full).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            io_context(e, "rename temp file onto", &full)
        })?;

        debug!(backend = %self.name, path, bytes = data.len(), "Wrote file");
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), BackendError> {
        let full = self.resolve(path)?;
        let metadata = fs::symlink_metadata(&full).map_err(|e| io_context(e, "stat", &full))?;
        if metadata.is_dir() {
            fs::remove_dir_all(&full).map_err(|e| io_context(e, "remove directory", &full))?;
        } else {
            fs::remove_file(&full).map_err(|e| io_context(e, "remove file", &full))?;
        }
        debug!(backend = %self.name, path, "Deleted");
        Ok(())
    }

    fn makedirs(&self, path: &str) -> Result<(), BackendError> {
        let full = self.resolve(path)?;
        fs::create_dir_all(&full).map_err(|e| io_context(e, "create directory", &full))
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), BackendError> {
        let src = self.resolve(from)?;
        let dst = self.resolve(to)?;
        if dst.is_dir() {
            fs::remove_dir_all(&dst).map_err(|e| io_context(e, "replace directory", &dst))?;
        }
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).map_err(|e| io_context(e, "create directory", parent))?;
        }
        fs::rename(&src, &dst).map_err(|e| io_context(e, "rename", &src))
    }

    fn walk(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let start = self.resolve(prefix)?;
        if !start.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&start).follow_links(false).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                BackendError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("Failed to walk directory {:?}: {}", start, e),
                ))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(rel) = self.relative(entry.path()) {
                files.push(rel);
            }
        }
        files.sort();
        Ok(files)
    }
}
