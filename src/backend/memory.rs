//! In-memory backend

use crate::backend::{clean_path, Backend};
use crate::error::BackendError;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Default)]
struct MemoryState {
    files: BTreeMap<String, Bytes>,
    dirs: BTreeSet<String>,
}

/// Ordered in-memory key/value backend
///
/// Directories exist implicitly as prefixes of stored files, or explicitly
/// through `makedirs`.
pub struct MemoryBackend {
    name: String,
    writable: bool,
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: format!("memory://{}", name.into()),
            writable: true,
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Backend that rejects every mutation
    ///
    /// Populate it with [`MemoryBackend::seed`] before use.
    pub fn read_only(name: impl Into<String>) -> Self {
        Self {
            writable: false,
            ..Self::new(name)
        }
    }

    /// Insert a file regardless of writability
    pub fn seed(&self, path: &str, data: impl Into<Bytes>) {
        let mut state = self.state.write();
        state.files.insert(clean_path(path).to_string(), data.into());
    }

    fn check_writable(&self) -> Result<(), BackendError> {
        if self.writable {
            Ok(())
        } else {
            Err(BackendError::ReadOnly(self.name.clone()))
        }
    }
}

fn dir_prefix(path: &str) -> String {
    let path = clean_path(path);
    if path.is_empty() {
        String::new()
    } else {
        format!("{}/", path)
    }
}

fn first_segment(rest: &str) -> &str {
    rest.split('/').next().unwrap_or(rest)
}

impl MemoryState {
    fn is_dir(&self, path: &str) -> bool {
        if path.is_empty() || self.dirs.contains(path) {
            return true;
        }
        let prefix = dir_prefix(path);
        self.files
            .range(prefix.clone()..)
            .next()
            .map(|(k, _)| k.starts_with(&prefix))
            .unwrap_or(false)
            || self
                .dirs
                .range(prefix.clone()..)
                .next()
                .map(|d| d.starts_with(&prefix))
                .unwrap_or(false)
    }

    fn keys_under(&self, path: &str) -> Vec<String> {
        let prefix = dir_prefix(path);
        self.files
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn dirs_under(&self, path: &str) -> Vec<String> {
        let prefix = dir_prefix(path);
        self.dirs
            .range(prefix.clone()..)
            .take_while(|d| d.starts_with(&prefix))
            .cloned()
            .collect()
    }

    fn remove_tree(&mut self, path: &str) -> bool {
        let mut removed = self.files.remove(path).is_some();
        removed |= self.dirs.remove(path);
        for key in self.keys_under(path) {
            self.files.remove(&key);
            removed = true;
        }
        for dir in self.dirs_under(path) {
            self.dirs.remove(&dir);
            removed = true;
        }
        removed
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn exists(&self, path: &str) -> Result<bool, BackendError> {
        let path = clean_path(path);
        let state = self.state.read();
        Ok(state.files.contains_key(path) || state.is_dir(path))
    }

    fn list(&self, prefix: &str) -> Result<BTreeSet<String>, BackendError> {
        let prefix = dir_prefix(prefix);
        let state = self.state.read();
        let mut names = BTreeSet::new();

        for (key, _) in state
            .files
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
        {
            names.insert(first_segment(&key[prefix.len()..]).to_string());
        }
        for dir in state
            .dirs
            .range(prefix.clone()..)
            .take_while(|d| d.starts_with(&prefix))
        {
            names.insert(first_segment(&dir[prefix.len()..]).to_string());
        }
        names.remove("");
        Ok(names)
    }

    fn get(&self, path: &str) -> Result<Bytes, BackendError> {
        let path = clean_path(path);
        self.state
            .read()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("{}/{}", self.name, path)))
    }

    fn put(&self, path: &str, data: &[u8]) -> Result<(), BackendError> {
        self.check_writable()?;
        let path = clean_path(path);
        let mut state = self.state.write();
        state.files.insert(path.to_string(), Bytes::copy_from_slice(data));
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), BackendError> {
        self.check_writable()?;
        let path = clean_path(path);
        let mut state = self.state.write();
        if state.remove_tree(path) {
            Ok(())
        } else {
            Err(BackendError::NotFound(format!("{}/{}", self.name, path)))
        }
    }

    fn makedirs(&self, path: &str) -> Result<(), BackendError> {
        self.check_writable()?;
        let path = clean_path(path);
        if !path.is_empty() {
            self.state.write().dirs.insert(path.to_string());
        }
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), BackendError> {
        self.check_writable()?;
        let from = clean_path(from);
        let to = clean_path(to);
        let mut state = self.state.write();

        if !state.files.contains_key(from) && !state.is_dir(from) {
            return Err(BackendError::NotFound(format!("{}/{}", self.name, from)));
        }
        state.remove_tree(to);

        if let Some(data) = state.files.remove(from) {
            state.files.insert(to.to_string(), data);
        }
        for key in state.keys_under(from) {
            if let Some(data) = state.files.remove(&key) {
                state.files.insert(format!("{}{}", to, &key[from.len()..]), data);
            }
        }
        for dir in state.dirs_under(from) {
            state.dirs.remove(&dir);
            state.dirs.insert(format!("{}{}", to, &dir[from.len()..]));
        }
        if state.dirs.remove(from) {
            state.dirs.insert(to.to_string());
        }
        Ok(())
    }

    fn walk(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let prefix = clean_path(prefix);
        let state = self.state.read();
        let mut files = state.keys_under(prefix);
        if state.files.contains_key(prefix) {
            files.push(prefix.to_string());
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_immediate_children() {
        let backend = MemoryBackend::new("t");
        backend.put("ExperimentRuns/TS_1/Picks/a.json", b"{}").unwrap();
        backend.put("ExperimentRuns/TS_2/Picks/b.json", b"{}").unwrap();
        backend.makedirs("ExperimentRuns/TS_3").unwrap();

        let runs: Vec<String> = backend.list("ExperimentRuns").unwrap().into_iter().collect();
        assert_eq!(runs, vec!["TS_1", "TS_2", "TS_3"]);

        let root: Vec<String> = backend.list("").unwrap().into_iter().collect();
        assert_eq!(root, vec!["ExperimentRuns"]);
    }

    #[test]
    fn test_prefix_does_not_match_sibling_names() {
        let backend = MemoryBackend::new("t");
        backend.put("TS_1/a", b"1").unwrap();
        backend.put("TS_10/b", b"2").unwrap();

        let names: Vec<String> = backend.list("TS_1").unwrap().into_iter().collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_read_only_rejects_mutations() {
        let backend = MemoryBackend::read_only("static");
        backend.seed("a/b", Bytes::from_static(b"x"));

        assert!(matches!(backend.put("a/c", b"y"), Err(BackendError::ReadOnly(_))));
        assert!(matches!(backend.delete("a/b"), Err(BackendError::ReadOnly(_))));
        assert_eq!(backend.get("a/b").unwrap(), Bytes::from_static(b"x"));
    }

    #[test]
    fn test_delete_and_rename_subtree() {
        let backend = MemoryBackend::new("t");
        backend.put(".staging-x.zarr/0/0", b"a").unwrap();
        backend.put(".staging-x.zarr/.zattrs", b"{}").unwrap();
        backend.put("x.zarr/stale", b"old").unwrap();

        backend.rename(".staging-x.zarr", "x.zarr").unwrap();
        assert_eq!(
            backend.walk("x.zarr").unwrap(),
            vec!["x.zarr/.zattrs".to_string(), "x.zarr/0/0".to_string()]
        );
        assert!(!backend.exists(".staging-x.zarr").unwrap());

        backend.delete("x.zarr").unwrap();
        assert!(!backend.exists("x.zarr").unwrap());
        assert!(matches!(backend.delete("x.zarr"), Err(BackendError::NotFound(_))));
    }
}
