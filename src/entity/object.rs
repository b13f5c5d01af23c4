//! Pickable objects declared in the configuration

use crate::backend::StoreHandle;
use crate::codec::keys::OBJECTS_DIR;
use crate::codec::ObjectKey;
use crate::config::PickableObjectConfig;
use crate::entity::Context;
use crate::error::CopickError;
use crate::overlay::Scope;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct PickableObject {
    ctx: Arc<Context>,
    config: PickableObjectConfig,
}

impl PickableObject {
    pub(crate) fn new(ctx: Arc<Context>, config: PickableObjectConfig) -> Self {
        Self { ctx, config }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn is_particle(&self) -> bool {
        self.config.is_particle
    }

    pub fn label(&self) -> Option<i64> {
        self.config.label
    }

    pub fn color(&self) -> Option<&[u8]> {
        self.config.color.as_deref()
    }

    pub fn radius(&self) -> Option<f64> {
        self.config.radius
    }

    pub fn identifier(&self) -> Option<&str> {
        self.config.identifier.as_deref()
    }

    pub fn pdb_id(&self) -> Option<&str> {
        self.config.pdb_id.as_deref()
    }

    pub fn map_threshold(&self) -> Option<f64> {
        self.config.map_threshold
    }

    pub fn config(&self) -> &PickableObjectConfig {
        &self.config
    }

    /// Reference density map under `Objects/`, from whichever side holds it
    pub fn reference_volume(&self) -> Result<Option<StoreHandle>, CopickError> {
        let scope = Scope::new(OBJECTS_DIR);
        match self.ctx.engine.resolve(&scope, &ObjectKey::new(self.name()))? {
            Some(resolved) => Ok(Some(self.ctx.engine.store(&scope, &resolved)?)),
            None => Ok(None),
        }
    }
}
