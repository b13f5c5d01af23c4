//! Per-session listing cache
//!
//! Caches raw child-name listings per (side, prefix). Owned by the merge engine
//! (and so by the Root); never shared across roots.

use crate::backend::clean_path;
use crate::overlay::Side;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

pub type Listing = Arc<BTreeSet<String>>;

#[derive(Debug, Default)]
pub struct ListingCache {
    entries: RwLock<HashMap<(Side, String), Listing>>,
}

fn is_under(path: &str, prefix: &str) -> bool {
    prefix.is_empty()
        || path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, side: Side, prefix: &str) -> Option<Listing> {
        self.entries
            .read()
            .get(&(side, clean_path(prefix).to_string()))
            .cloned()
    }

    pub fn insert(&self, side: Side, prefix: &str, names: BTreeSet<String>) -> Listing {
        let listing = Arc::new(names);
        self.entries
            .write()
            .insert((side, clean_path(prefix).to_string()), Arc::clone(&listing));
        listing
    }

    /// Record that `path` now exists on `side`
    ///
    /// Every cached ancestor listing gains the corresponding child name, so a
    /// freshly created entity is visible without a refresh.
    pub fn record_created(&self, side: Side, path: &str) {
        let path = clean_path(path);
        let mut entries = self.entries.write();
        let mut parent = String::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            if let Some(listing) = entries.get_mut(&(side, parent.clone())) {
                if !listing.contains(component) {
                    Arc::make_mut(listing).insert(component.to_string());
                }
            }
            if !parent.is_empty() {
                parent.push('/');
            }
            parent.push_str(component);
        }
    }

    /// Record that `path` no longer exists on `side`
    ///
    /// The name leaves its parent listing and every cached listing below it is dropped.
    pub fn record_deleted(&self, side: Side, path: &str) {
        let path = clean_path(path);
        let (parent, name) = match path.rsplit_once('/') {
            Some((parent, name)) => (parent.to_string(), name),
            None => (String::new(), path),
        };
        let mut entries = self.entries.write();
        if let Some(listing) = entries.get_mut(&(side, parent)) {
            if listing.contains(name) {
                Arc::make_mut(listing).remove(name);
            }
        }
        entries.retain(|(s, prefix), _| *s != side || !is_under(prefix, path));
    }

    /// Drop every cached listing of `side` at or below `prefix`
    pub fn invalidate_under(&self, side: Side, prefix: &str) {
        let prefix = clean_path(prefix);
        self.entries
            .write()
            .retain(|(s, cached), _| *s != side || !is_under(cached, prefix));
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
