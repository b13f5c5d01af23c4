//! Surface annotations stored as binary scene documents

use crate::codec::MeshKey;
use crate::entity::Context;
use crate::error::CopickError;
use crate::overlay::{Provenance, Resolved, Scope};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Mesh {
    ctx: Arc<Context>,
    scope: Scope,
    resolved: Resolved<MeshKey>,
}

impl Mesh {
    pub(crate) fn new(ctx: Arc<Context>, scope: Scope, resolved: Resolved<MeshKey>) -> Self {
        Self {
            ctx,
            scope,
            resolved,
        }
    }

    pub fn key(&self) -> &MeshKey {
        &self.resolved.key
    }

    pub fn object_name(&self) -> &str {
        &self.resolved.key.object_name
    }

    pub fn user_id(&self) -> &str {
        &self.resolved.key.user_id
    }

    pub fn session_id(&self) -> &str {
        &self.resolved.key.session_id
    }

    pub fn provenance(&self) -> Provenance {
        self.resolved.provenance
    }

    pub fn load(&self) -> Result<Bytes, CopickError> {
        self.ctx.engine.read(&self.scope, &self.resolved)
    }

    pub fn store(&self, scene: &[u8]) -> Result<(), CopickError> {
        self.ctx.engine.write(&self.scope, &self.resolved, scene)
    }

    pub fn copy_up(&mut self) -> Result<(), CopickError> {
        self.resolved = self.ctx.engine.copy_up(&self.scope, &self.resolved)?;
        Ok(())
    }
}
