//! Tomograms and their feature stores

use crate::backend::StoreHandle;
use crate::codec::{FeaturesKey, Spacing, TomogramKey};
use crate::entity::{multiscale_level, multiscale_levels, Context, Features};
use crate::error::CopickError;
use crate::overlay::{Payload, Provenance, Resolved, Scope};
use bytes::Bytes;
use std::sync::Arc;

/// Multiscale tomogram store
#[derive(Debug, Clone)]
pub struct Tomogram {
    ctx: Arc<Context>,
    scope: Scope,
    voxel_spacing: Spacing,
    resolved: Resolved<TomogramKey>,
}

impl Tomogram {
    pub(crate) fn new(
        ctx: Arc<Context>,
        scope: Scope,
        voxel_spacing: Spacing,
        resolved: Resolved<TomogramKey>,
    ) -> Self {
        Self {
            ctx,
            scope,
            voxel_spacing,
            resolved,
        }
    }

    pub fn tomo_type(&self) -> &str {
        &self.resolved.key.tomo_type
    }

    pub fn voxel_spacing(&self) -> Spacing {
        self.voxel_spacing
    }

    pub fn provenance(&self) -> Provenance {
        self.resolved.provenance
    }

    pub fn is_read_only(&self) -> bool {
        !self.resolved.provenance.is_writable()
    }

    /// Whole store, served from the overlay when it holds a copy
    pub fn store(&self) -> Result<StoreHandle, CopickError> {
        self.ctx.engine.store(&self.scope, &self.resolved)
    }

    /// Multiscale level indices present in the store
    pub fn levels(&self) -> Result<Vec<u32>, CopickError> {
        multiscale_levels(&self.store()?)
    }

    pub fn level(&self, level: u32) -> Result<StoreHandle, CopickError> {
        multiscale_level(&self.store()?, level)
    }

    pub fn features(&self) -> Result<Vec<Features>, CopickError> {
        Ok(self
            .ctx
            .engine
            .resolve_all::<FeaturesKey>(&self.scope)?
            .into_iter()
            .filter(|r| r.key.tomo_type == self.resolved.key.tomo_type)
            .map(|resolved| Features::new(Arc::clone(&self.ctx), self.scope.clone(), resolved))
            .collect())
    }

    pub fn get_features(&self, feature_type: &str) -> Result<Features, CopickError> {
        let key = FeaturesKey::new(self.tomo_type(), feature_type);
        let resolved = self.ctx.engine.require(&self.scope, &key)?;
        Ok(Features::new(Arc::clone(&self.ctx), self.scope.clone(), resolved))
    }

    /// Create a derived features store
    ///
    /// Requires a writable tomogram: a static-only tomogram must be copied up first.
    pub fn new_features(
        &self,
        feature_type: &str,
        entries: Vec<(String, Bytes)>,
    ) -> Result<Features, CopickError> {
        let current = self.ctx.engine.require(&self.scope, &self.resolved.key)?;
        if !current.provenance.is_writable() {
            return Err(CopickError::ReadOnlyViolation(format!(
                "tomogram '{}' exists only on the static backend; copy it up before adding features",
                self.tomo_type()
            )));
        }
        let key = FeaturesKey::new(self.tomo_type(), feature_type);
        let resolved = self
            .ctx
            .engine
            .create(&self.scope, &key, Payload::Store(entries))?;
        Ok(Features::new(Arc::clone(&self.ctx), self.scope.clone(), resolved))
    }

    pub fn delete_features(&self, feature_type: &str) -> Result<(), CopickError> {
        let key = FeaturesKey::new(self.tomo_type(), feature_type);
        self.ctx.engine.delete(&self.scope, &key)?;
        Ok(())
    }

    /// Copy a static-only tomogram to the overlay; no-op otherwise
    pub fn copy_up(&mut self) -> Result<(), CopickError> {
        self.resolved = self.ctx.engine.copy_up(&self.scope, &self.resolved)?;
        Ok(())
    }
}
