//! Per-voxel feature stores

use crate::backend::StoreHandle;
use crate::codec::FeaturesKey;
use crate::entity::Context;
use crate::error::CopickError;
use crate::overlay::{Provenance, Resolved, Scope};
use std::sync::Arc;

/// Feature volume computed from a tomogram, full resolution only
#[derive(Debug, Clone)]
pub struct Features {
    ctx: Arc<Context>,
    scope: Scope,
    resolved: Resolved<FeaturesKey>,
}

impl Features {
    pub(crate) fn new(ctx: Arc<Context>, scope: Scope, resolved: Resolved<FeaturesKey>) -> Self {
        Self {
            ctx,
            scope,
            resolved,
        }
    }

    pub fn tomo_type(&self) -> &str {
        &self.resolved.key.tomo_type
    }

    pub fn feature_type(&self) -> &str {
        &self.resolved.key.feature_type
    }

    pub fn provenance(&self) -> Provenance {
        self.resolved.provenance
    }

    pub fn store(&self) -> Result<StoreHandle, CopickError> {
        self.ctx.engine.store(&self.scope, &self.resolved)
    }

    pub fn copy_up(&mut self) -> Result<(), CopickError> {
        self.resolved = self.ctx.engine.copy_up(&self.scope, &self.resolved)?;
        Ok(())
    }
}
