//! Point annotations
//!
//! One JSON document per (object, user, session). Points carry a location in
//! angstrom, a 4x4 homogeneous transformation, an instance id and a score.

use crate::codec::PicksKey;
use crate::entity::Context;
use crate::error::CopickError;
use crate::overlay::{Provenance, Resolved, Scope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CopickLocation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopickPoint {
    pub location: CopickLocation,
    #[serde(rename = "transformation_", default = "identity")]
    pub transformation: [[f64; 4]; 4],
    #[serde(default)]
    pub instance_id: i64,
    #[serde(default = "default_score")]
    pub score: f64,
}

fn identity() -> [[f64; 4]; 4] {
    let mut m = [[0.0; 4]; 4];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    m
}

fn default_score() -> f64 {
    1.0
}

fn default_unit() -> String {
    "angstrom".to_string()
}

impl CopickPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            location: CopickLocation { x, y, z },
            transformation: identity(),
            instance_id: 0,
            score: default_score(),
        }
    }
}

/// On-disk picks document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicksFile {
    pub pickable_object_name: String,
    pub user_id: String,
    pub session_id: String,
    #[serde(default)]
    pub run_name: Option<String>,
    #[serde(default)]
    pub voxel_spacing: Option<f64>,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub points: Vec<CopickPoint>,
    #[serde(default)]
    pub trust_orientation: bool,
}

impl PicksFile {
    pub fn empty(object_name: &str, user_id: &str, session_id: &str, run_name: &str) -> Self {
        Self {
            pickable_object_name: object_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            run_name: Some(run_name.to_string()),
            voxel_spacing: None,
            unit: default_unit(),
            points: Vec::new(),
            trust_orientation: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Picks {
    ctx: Arc<Context>,
    scope: Scope,
    resolved: Resolved<PicksKey>,
}

impl Picks {
    pub(crate) fn new(ctx: Arc<Context>, scope: Scope, resolved: Resolved<PicksKey>) -> Self {
        Self {
            ctx,
            scope,
            resolved,
        }
    }

    pub fn key(&self) -> &PicksKey {
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

    pub fn load(&self) -> Result<PicksFile, CopickError> {
        let bytes = self.ctx.engine.read(&self.scope, &self.resolved)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn points(&self) -> Result<Vec<CopickPoint>, CopickError> {
        Ok(self.load()?.points)
    }

    /// Replace the points, keeping the rest of the document
    pub fn store(&self, points: &[CopickPoint]) -> Result<(), CopickError> {
        let mut document = self.load()?;
        document.points = points.to_vec();
        self.store_file(&document)
    }

    pub fn store_file(&self, document: &PicksFile) -> Result<(), CopickError> {
        let bytes = serde_json::to_vec_pretty(document)?;
        self.ctx.engine.write(&self.scope, &self.resolved, &bytes)
    }

    pub fn copy_up(&mut self) -> Result<(), CopickError> {
        self.resolved = self.ctx.engine.copy_up(&self.scope, &self.resolved)?;
        Ok(())
    }
}
