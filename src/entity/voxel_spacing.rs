//! Voxel spacings and the tomograms inside them

use crate::codec::{FeaturesKey, Spacing, TomogramKey, VoxelSpacingKey};
use crate::entity::{Context, Features, Tomogram};
use crate::error::CopickError;
use crate::overlay::{Payload, Provenance, Resolved, Scope};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct VoxelSpacing {
    ctx: Arc<Context>,
    run_name: String,
    resolved: Resolved<VoxelSpacingKey>,
    scope: Scope,
}

impl VoxelSpacing {
    pub(crate) fn new(
        ctx: Arc<Context>,
        run_name: &str,
        run_scope: &Scope,
        resolved: Resolved<VoxelSpacingKey>,
    ) -> Self {
        let scope = resolved.child_scope(run_scope);
        Self {
            ctx,
            run_name: run_name.to_string(),
            resolved,
            scope,
        }
    }

    pub fn spacing(&self) -> Spacing {
        self.resolved.key.spacing
    }

    /// Voxel size in angstrom
    pub fn voxel_size(&self) -> f64 {
        self.resolved.key.spacing.value()
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn provenance(&self) -> Provenance {
        self.resolved.provenance
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn tomograms(&self) -> Result<Vec<Tomogram>, CopickError> {
        Ok(self
            .ctx
            .engine
            .resolve_all::<TomogramKey>(&self.scope)?
            .into_iter()
            .map(|resolved| self.tomogram(resolved))
            .collect())
    }

    pub fn get_tomogram(&self, tomo_type: &str) -> Result<Tomogram, CopickError> {
        let resolved = self
            .ctx
            .engine
            .require(&self.scope, &TomogramKey::new(tomo_type))?;
        Ok(self.tomogram(resolved))
    }

    /// Create a tomogram store; `entries` are store keys and their bytes
    pub fn new_tomogram(
        &self,
        tomo_type: &str,
        entries: Vec<(String, Bytes)>,
    ) -> Result<Tomogram, CopickError> {
        let resolved = self.ctx.engine.create(
            &self.scope,
            &TomogramKey::new(tomo_type),
            Payload::Store(entries),
        )?;
        Ok(self.tomogram(resolved))
    }

    pub fn delete_tomogram(&self, tomo_type: &str) -> Result<(), CopickError> {
        self.ctx
            .engine
            .delete(&self.scope, &TomogramKey::new(tomo_type))?;
        Ok(())
    }

    /// Every features store in this spacing, across tomograms
    pub fn features(&self) -> Result<Vec<Features>, CopickError> {
        Ok(self
            .ctx
            .engine
            .resolve_all::<FeaturesKey>(&self.scope)?
            .into_iter()
            .map(|resolved| Features::new(Arc::clone(&self.ctx), self.scope.clone(), resolved))
            .collect())
    }

    fn tomogram(&self, resolved: Resolved<TomogramKey>) -> Tomogram {
        Tomogram::new(
            Arc::clone(&self.ctx),
            self.scope.clone(),
            self.resolved.key.spacing,
            resolved,
        )
    }
}
