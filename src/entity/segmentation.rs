//! Volumetric label annotations

use crate::backend::StoreHandle;
use crate::codec::{SegmentationKey, Spacing};
use crate::entity::{multiscale_levels, Context};
use crate::error::CopickError;
use crate::overlay::{Provenance, Resolved, Scope};
use std::sync::Arc;

/// Segmentation store; single-label ones are named after a pickable object
#[derive(Debug, Clone)]
pub struct Segmentation {
    ctx: Arc<Context>,
    scope: Scope,
    resolved: Resolved<SegmentationKey>,
}

impl Segmentation {
    pub(crate) fn new(ctx: Arc<Context>, scope: Scope, resolved: Resolved<SegmentationKey>) -> Self {
        Self {
            ctx,
            scope,
            resolved,
        }
    }

    pub fn key(&self) -> &SegmentationKey {
        &self.resolved.key
    }

    pub fn name(&self) -> &str {
        &self.resolved.key.name
    }

    pub fn voxel_spacing(&self) -> Spacing {
        self.resolved.key.voxel_spacing
    }

    pub fn user_id(&self) -> &str {
        &self.resolved.key.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.resolved.key.session_id
    }

    pub fn is_multilabel(&self) -> bool {
        self.resolved.key.is_multilabel
    }

    pub fn provenance(&self) -> Provenance {
        self.resolved.provenance
    }

    pub fn store(&self) -> Result<StoreHandle, CopickError> {
        self.ctx.engine.store(&self.scope, &self.resolved)
    }

    pub fn levels(&self) -> Result<Vec<u32>, CopickError> {
        multiscale_levels(&self.store()?)
    }

    pub fn copy_up(&mut self) -> Result<(), CopickError> {
        self.resolved = self.ctx.engine.copy_up(&self.scope, &self.resolved)?;
        Ok(())
    }
}
