//! Diagnostic channel for storage entries the merge engine could not use.
//!
//! Entries are recorded once (deduplicated) and kept in first-seen order.

use crate::overlay::Side;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

/// A raw storage name that was excluded from a listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MalformedEntry {
    pub side: Side,
    pub backend: String,
    pub prefix: String,
    pub name: String,
    pub kind: &'static str,
    pub reason: String,
}

impl MalformedEntry {
    /// Full path of the entry inside its backend
    pub fn path(&self) -> String {
        crate::backend::join_path(&[&self.prefix, &self.name])
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<MalformedEntry>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry; returns false if it was already known
    pub fn record(&self, entry: MalformedEntry) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains(&entry) {
            return false;
        }
        warn!(
            side = ?entry.side,
            backend = %entry.backend,
            path = %entry.path(),
            kind = entry.kind,
            reason = %entry.reason,
            "Skipping malformed storage entry"
        );
        entries.push(entry);
        true
    }

    pub fn entries(&self) -> Vec<MalformedEntry> {
        self.entries.lock().clone()
    }

    /// Take every recorded entry, leaving the channel empty
    pub fn drain(&self) -> Vec<MalformedEntry> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
