//! Overlay Merge Engine
//!
//! Two backends sit under every entity tree: an optional read-only static side and
//! an optional writable overlay side. Listing a scope (a parent path plus the key
//! kind being listed) decodes the raw names from both sides, drops what cannot be
//! decoded into the diagnostics channel, and unions the rest by key. A key present
//! on both sides is served from the overlay.
//!
//! Writes only ever touch the overlay. A static-only entity becomes writable by an
//! explicit [`OverlayEngine::copy_up`], which copies it under a hidden staging name
//! and renames it into place, so readers never observe a half-copied store.

use crate::backend::{Backend, StoreHandle};
use crate::codec::{is_hidden, EntityKey};
use crate::error::CopickError;
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

pub mod cache;
pub mod diagnostics;
pub mod scope;

pub use cache::{Listing, ListingCache};
pub use diagnostics::{Diagnostics, MalformedEntry};
pub use scope::Scope;

/// Prefix of hidden staging entries used while copying a store up
pub const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Static,
    Overlay,
}

/// Where a resolved key lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    StaticOnly,
    OverlayOnly,
    Both,
}

impl Provenance {
    /// Whether the entity can be mutated in place
    pub fn is_writable(&self) -> bool {
        !matches!(self, Provenance::StaticOnly)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Provenance::StaticOnly => "static",
            Provenance::OverlayOnly => "overlay",
            Provenance::Both => "both",
        }
    }
}

/// A key found in a merged listing, with the raw name it has on each side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<K> {
    pub key: K,
    pub provenance: Provenance,
    pub static_name: Option<String>,
    pub overlay_name: Option<String>,
}

impl<K: EntityKey> Resolved<K> {
    fn from_names(key: K, static_name: Option<String>, overlay_name: Option<String>) -> Option<Self> {
        let provenance = match (&static_name, &overlay_name) {
            (Some(_), None) => Provenance::StaticOnly,
            (None, Some(_)) => Provenance::OverlayOnly,
            (Some(_), Some(_)) => Provenance::Both,
            (None, None) => return None,
        };
        Some(Self {
            key,
            provenance,
            static_name,
            overlay_name,
        })
    }

    /// Side that serves reads
    pub fn read_side(&self) -> Side {
        if self.overlay_name.is_some() {
            Side::Overlay
        } else {
            Side::Static
        }
    }

    /// Raw name on the side that serves reads
    pub fn read_name(&self) -> &str {
        self.overlay_name
            .as_deref()
            .or(self.static_name.as_deref())
            .unwrap_or_default()
    }

    /// Scope of this entity's own children
    pub fn child_scope(&self, parent: &Scope) -> Scope {
        parent.child(
            self.static_name.as_deref(),
            self.overlay_name.as_deref(),
            &self.key.encode(),
        )
    }
}

/// What a create writes on the overlay
#[derive(Debug, Clone)]
pub enum Payload {
    /// A single document written atomically
    Document(Bytes),
    /// A directory store, populated under a staging name then renamed into place
    Store(Vec<(String, Bytes)>),
    /// A plain directory (runs, voxel spacings)
    Directory,
}

#[derive(Default)]
struct Slot {
    static_name: Option<String>,
    overlay_name: Option<String>,
}

/// Merges a static backend and an overlay backend into one view
pub struct OverlayEngine {
    static_backend: Option<Arc<dyn Backend>>,
    overlay_backend: Option<Arc<dyn Backend>>,
    cache: ListingCache,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for OverlayEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayEngine")
            .field("static", &self.static_backend.as_ref().map(|b| b.name().to_string()))
            .field("overlay", &self.overlay_backend.as_ref().map(|b| b.name().to_string()))
            .field("cached_listings", &self.cache.len())
            .finish()
    }
}

fn staging_name(encoded: &str) -> String {
    format!("{}{}", STAGING_PREFIX, encoded)
}

impl OverlayEngine {
    pub fn new(
        static_backend: Option<Arc<dyn Backend>>,
        overlay_backend: Option<Arc<dyn Backend>>,
    ) -> Self {
        Self {
            static_backend,
            overlay_backend,
            cache: ListingCache::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn static_backend(&self) -> Option<&Arc<dyn Backend>> {
        self.static_backend.as_ref()
    }

    pub fn overlay_backend(&self) -> Option<&Arc<dyn Backend>> {
        self.overlay_backend.as_ref()
    }

    pub fn backend(&self, side: Side) -> Option<&Arc<dyn Backend>> {
        match side {
            Side::Static => self.static_backend.as_ref(),
            Side::Overlay => self.overlay_backend.as_ref(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn cache(&self) -> &ListingCache {
        &self.cache
    }

    /// The overlay backend, or a read-only violation naming `what`
    fn writable_overlay(&self, what: &str) -> Result<&Arc<dyn Backend>, CopickError> {
        match &self.overlay_backend {
            Some(backend) if backend.is_writable() => Ok(backend),
            Some(backend) => Err(CopickError::ReadOnlyViolation(format!(
                "cannot write {}: overlay backend '{}' is read-only",
                what,
                backend.name()
            ))),
            None => Err(CopickError::ReadOnlyViolation(format!(
                "cannot write {}: no overlay backend is configured",
                what
            ))),
        }
    }

    fn side_backend(&self, side: Side) -> Result<&Arc<dyn Backend>, CopickError> {
        self.backend(side).ok_or_else(|| {
            CopickError::BackendUnavailable(format!("no {:?} backend is configured", side))
        })
    }

    /// Raw child names of `prefix` on one side, cached for the session
    pub fn listing(&self, side: Side, prefix: &str) -> Result<Listing, CopickError> {
        if let Some(listing) = self.cache.get(side, prefix) {
            return Ok(listing);
        }
        let Some(backend) = self.backend(side) else {
            return Ok(Listing::default());
        };
        let names = backend.list(prefix)?;
        debug!(side = ?side, backend = backend.name(), prefix, count = names.len(), "Listed prefix");
        Ok(self.cache.insert(side, prefix, names))
    }

    /// Merged listing of every `K` directly inside `scope`, ordered by key
    pub fn resolve_all<K: EntityKey>(&self, scope: &Scope) -> Result<Vec<Resolved<K>>, CopickError> {
        let mut merged: BTreeMap<K, Slot> = BTreeMap::new();

        for side in [Side::Static, Side::Overlay] {
            let Some(backend) = self.backend(side) else {
                continue;
            };
            let prefix = scope.path(side);
            let listing = self.listing(side, prefix)?;
            for name in listing.iter() {
                if is_hidden(name) {
                    continue;
                }
                let key = match K::decode(name) {
                    Ok(Some(key)) => key,
                    Ok(None) => continue,
                    Err(err) => {
                        self.diagnostics.record(MalformedEntry {
                            side,
                            backend: backend.name().to_string(),
                            prefix: prefix.to_string(),
                            name: name.clone(),
                            kind: K::KIND,
                            reason: err.to_string(),
                        });
                        continue;
                    }
                };
                let canonical = key.encode();
                let slot = merged.entry(key).or_default();
                let target = match side {
                    Side::Static => &mut slot.static_name,
                    Side::Overlay => &mut slot.overlay_name,
                };
                // Several raw aliases of one key on one side: the canonical name wins,
                // otherwise the first in listing order; the rest are shadowed.
                let shadowed = match target {
                    None => {
                        *target = Some(name.clone());
                        None
                    }
                    Some(existing) if *name == canonical => {
                        Some(std::mem::replace(existing, name.clone()))
                    }
                    Some(_) => Some(name.clone()),
                };
                if let Some(shadowed) = shadowed {
                    debug!(
                        kind = K::KIND,
                        backend = backend.name(),
                        prefix = %prefix,
                        name = %shadowed,
                        winner = target.as_deref().unwrap_or_default(),
                        "Skipping alias of an equivalent name"
                    );
                }
            }
        }

        let resolved: Vec<Resolved<K>> = merged
            .into_iter()
            .filter_map(|(key, slot)| Resolved::from_names(key, slot.static_name, slot.overlay_name))
            .collect();
        trace!(kind = K::KIND, scope = %scope, count = resolved.len(), "Merged listing");
        Ok(resolved)
    }

    /// Resolve one key inside `scope`
    pub fn resolve<K: EntityKey>(&self, scope: &Scope, key: &K) -> Result<Option<Resolved<K>>, CopickError> {
        let all = self.resolve_all::<K>(scope)?;
        Ok(all
            .binary_search_by(|r| r.key.cmp(key))
            .ok()
            .and_then(|idx| all.into_iter().nth(idx)))
    }

    /// Resolve one key or fail with `NotFound`
    pub fn require<K: EntityKey>(&self, scope: &Scope, key: &K) -> Result<Resolved<K>, CopickError> {
        self.resolve(scope, key)?.ok_or_else(|| {
            CopickError::NotFound(format!("{} '{}' in {}", K::KIND, key.encode(), scope))
        })
    }

    /// Refuse a create whose encoded name is taken or ambiguous with an existing name
    fn check_collision<K: EntityKey>(&self, scope: &Scope, key: &K) -> Result<(), CopickError> {
        let encoded = key.encode();
        if let Some(existing) = self.resolve(scope, key)? {
            return Err(CopickError::NameCollision(format!(
                "{} '{}' already exists in {} ({})",
                K::KIND,
                encoded,
                scope,
                existing.provenance.label()
            )));
        }
        // Names differing only by case alias each other on case-insensitive filesystems
        for side in [Side::Static, Side::Overlay] {
            let listing = self.listing(side, scope.path(side))?;
            if let Some(clash) = listing.iter().find(|n| n.eq_ignore_ascii_case(&encoded)) {
                return Err(CopickError::NameCollision(format!(
                    "{} '{}' is ambiguous with existing entry '{}' in {}",
                    K::KIND,
                    encoded,
                    clash,
                    scope
                )));
            }
        }
        Ok(())
    }

    /// Create a new entity on the overlay
    ///
    /// The result is visible to every later listing in this session.
    pub fn create<K: EntityKey>(
        &self,
        scope: &Scope,
        key: &K,
        payload: Payload,
    ) -> Result<Resolved<K>, CopickError> {
        key.validate()?;
        let encoded = key.encode();
        let overlay = self.writable_overlay(&format!("{} '{}'", K::KIND, encoded))?;
        self.check_collision(scope, key)?;

        let path = scope.entry(Side::Overlay, &encoded);
        match payload {
            Payload::Document(data) => overlay.put(&path, &data)?,
            Payload::Directory => overlay.makedirs(&path)?,
            Payload::Store(entries) if entries.is_empty() => overlay.makedirs(&path)?,
            Payload::Store(entries) => {
                let staging = scope.entry(Side::Overlay, &staging_name(&encoded));
                if overlay.exists(&staging)? {
                    overlay.delete(&staging)?;
                }
                for (entry, data) in &entries {
                    overlay.put(&join_entry(&staging, entry), data)?;
                }
                overlay.rename(&staging, &path)?;
            }
        }
        self.cache.record_created(Side::Overlay, &path);
        info!(kind = K::KIND, path = %path, backend = overlay.name(), "Created entity");

        Ok(Resolved {
            key: key.clone(),
            provenance: Provenance::OverlayOnly,
            static_name: None,
            overlay_name: Some(encoded),
        })
    }

    /// Delete an entity's overlay copy
    ///
    /// A key that also exists statically resurfaces as static-only afterwards.
    pub fn delete<K: EntityKey>(&self, scope: &Scope, key: &K) -> Result<Resolved<K>, CopickError> {
        let resolved = self.require(scope, key)?;
        let Some(overlay_name) = resolved.overlay_name.as_deref() else {
            return Err(CopickError::ReadOnlyViolation(format!(
                "{} '{}' exists only on the static backend",
                K::KIND,
                key.encode()
            )));
        };
        let overlay = self.writable_overlay(&format!("{} '{}'", K::KIND, key.encode()))?;
        let path = scope.entry(Side::Overlay, overlay_name);
        overlay.delete(&path)?;
        self.cache.record_deleted(Side::Overlay, &path);
        info!(kind = K::KIND, path = %path, backend = overlay.name(), "Deleted entity");
        Ok(resolved)
    }

    /// Promote a static-only entity by copying it to the overlay
    ///
    /// Resolves the key again first: a key that already has an overlay copy is
    /// returned as it currently stands, without copying.
    pub fn copy_up<K: EntityKey>(&self, scope: &Scope, resolved: &Resolved<K>) -> Result<Resolved<K>, CopickError> {
        let resolved = self.require(scope, &resolved.key)?;
        if resolved.overlay_name.is_some() {
            return Ok(resolved);
        }
        let Some(static_name) = resolved.static_name.as_deref() else {
            return Ok(resolved);
        };
        let encoded = resolved.key.encode();
        let overlay = self.writable_overlay(&format!("{} '{}'", K::KIND, encoded))?;
        let source_backend = self.side_backend(Side::Static)?;

        let source = scope.entry(Side::Static, static_name);
        let target = scope.entry(Side::Overlay, &encoded);
        let files = source_backend.walk(&source)?;

        if files.len() == 1 && files[0] == source {
            let data = source_backend.get(&source)?;
            overlay.put(&target, &data)?;
        } else if files.is_empty() {
            overlay.makedirs(&target)?;
        } else {
            let staging = scope.entry(Side::Overlay, &staging_name(&encoded));
            if overlay.exists(&staging)? {
                overlay.delete(&staging)?;
            }
            for file in &files {
                let relative = file
                    .strip_prefix(source.as_str())
                    .map(|r| r.trim_start_matches('/'))
                    .unwrap_or(file.as_str());
                let data = source_backend.get(file)?;
                overlay.put(&join_entry(&staging, relative), &data)?;
            }
            overlay.rename(&staging, &target)?;
        }
        self.cache.record_created(Side::Overlay, &target);
        info!(
            kind = K::KIND,
            from = %source,
            to = %target,
            files = files.len(),
            "Copied entity up to overlay"
        );

        Ok(Resolved {
            key: resolved.key.clone(),
            provenance: Provenance::Both,
            static_name: resolved.static_name.clone(),
            overlay_name: Some(encoded),
        })
    }

    /// Read a document entity from the side that serves it
    pub fn read<K: EntityKey>(&self, scope: &Scope, resolved: &Resolved<K>) -> Result<Bytes, CopickError> {
        let resolved = self.require(scope, &resolved.key)?;
        let side = resolved.read_side();
        let backend = self.side_backend(side)?;
        let path = scope.entry(side, resolved.read_name());
        trace!(kind = K::KIND, path = %path, backend = backend.name(), "Reading document");
        Ok(backend.get(&path)?)
    }

    /// Replace a document entity's contents on the overlay
    ///
    /// The key must still exist; a deleted entity is not recreated.
    pub fn write<K: EntityKey>(&self, scope: &Scope, resolved: &Resolved<K>, data: &[u8]) -> Result<(), CopickError> {
        let resolved = self.require(scope, &resolved.key)?;
        let Some(overlay_name) = resolved.overlay_name.as_deref() else {
            return Err(CopickError::ReadOnlyViolation(format!(
                "{} '{}' exists only on the static backend; copy it up first",
                K::KIND,
                resolved.key.encode()
            )));
        };
        let overlay = self.writable_overlay(&format!("{} '{}'", K::KIND, resolved.key.encode()))?;
        let path = scope.entry(Side::Overlay, overlay_name);
        overlay.put(&path, data)?;
        debug!(kind = K::KIND, path = %path, bytes = data.len(), "Wrote document");
        Ok(())
    }

    /// Store handle over a directory entity, writable only when it has an overlay copy
    pub fn store<K: EntityKey>(&self, scope: &Scope, resolved: &Resolved<K>) -> Result<StoreHandle, CopickError> {
        let resolved = self.require(scope, &resolved.key)?;
        let side = resolved.read_side();
        let backend = self.side_backend(side)?;
        let writable = side == Side::Overlay && backend.is_writable();
        Ok(StoreHandle::new(
            Arc::clone(backend),
            scope.entry(side, resolved.read_name()),
            writable,
        ))
    }

    /// Drop cached listings (everything, or only at and below `scope`)
    pub fn refresh(&self, scope: Option<&Scope>) {
        match scope {
            Some(scope) => {
                for side in [Side::Static, Side::Overlay] {
                    self.cache.invalidate_under(side, scope.path(side));
                }
                debug!(scope = %scope, "Refreshed listing cache");
            }
            None => {
                self.cache.clear();
                for backend in [&self.static_backend, &self.overlay_backend].into_iter().flatten() {
                    backend.refresh();
                }
                debug!("Refreshed listing cache");
            }
        }
    }
}

fn join_entry(base: &str, entry: &str) -> String {
    crate::backend::join_path(&[base, entry])
}
