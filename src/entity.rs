//! Entity Tree
//!
//! Typed handles over the merge engine: [`Root`] owns the engine and the project
//! configuration; every other entity carries a shared reference to them plus its
//! own resolution (key, provenance, raw names) and the scope it lives in.

use crate::backend::StoreHandle;
use crate::codec::Spacing;
use crate::config::CopickConfig;
use crate::error::CopickError;
use crate::overlay::{OverlayEngine, Scope};

mod features;
mod mesh;
mod object;
mod picks;
mod root;
mod run;
mod segmentation;
mod tomogram;
mod voxel_spacing;

pub use features::Features;
pub use mesh::Mesh;
pub use object::PickableObject;
pub use picks::{CopickLocation, CopickPoint, Picks, PicksFile};
pub use root::{Root, RootBuilder};
pub use run::Run;
pub use segmentation::Segmentation;
pub use tomogram::Tomogram;
pub use voxel_spacing::VoxelSpacing;

/// State shared by every entity of one Root
#[derive(Debug)]
pub(crate) struct Context {
    pub(crate) config: CopickConfig,
    pub(crate) engine: OverlayEngine,
}

impl Context {
    /// Fail unless `name` is a configured pickable object
    pub(crate) fn require_object(&self, name: &str) -> Result<(), CopickError> {
        if self.config.object(name).is_some() {
            Ok(())
        } else {
            Err(CopickError::NotFound(format!(
                "pickable object '{}' is not defined in the configuration",
                name
            )))
        }
    }
}

/// Selects picks or meshes by any combination of object, user and session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationFilter {
    pub object_name: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl AnnotationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, object_name: impl Into<String>) -> Self {
        self.object_name = Some(object_name.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn matches(&self, object_name: &str, user_id: &str, session_id: &str) -> bool {
        field_matches(&self.object_name, object_name)
            && field_matches(&self.user_id, user_id)
            && field_matches(&self.session_id, session_id)
    }
}

/// Selects segmentations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentationFilter {
    pub voxel_spacing: Option<Spacing>,
    pub name: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub is_multilabel: Option<bool>,
}

impl SegmentationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn voxel_size(mut self, value: f64) -> Result<Self, CopickError> {
        self.voxel_spacing = Some(Spacing::new(value)?);
        Ok(self)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn multilabel(mut self, is_multilabel: bool) -> Self {
        self.is_multilabel = Some(is_multilabel);
        self
    }

    pub fn matches(&self, key: &crate::codec::SegmentationKey) -> bool {
        self.voxel_spacing.map(|s| s == key.voxel_spacing).unwrap_or(true)
            && field_matches(&self.name, &key.name)
            && field_matches(&self.user_id, &key.user_id)
            && field_matches(&self.session_id, &key.session_id)
            && self
                .is_multilabel
                .map(|m| m == key.is_multilabel)
                .unwrap_or(true)
    }
}

fn field_matches(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().map(|f| f == value).unwrap_or(true)
}

/// Numeric multiscale level names inside a store, ascending
pub(crate) fn multiscale_levels(store: &StoreHandle) -> Result<Vec<u32>, CopickError> {
    let mut levels: Vec<u32> = store
        .list("")?
        .iter()
        .filter_map(|name| name.parse().ok())
        .collect();
    levels.sort_unstable();
    Ok(levels)
}

/// Store handle for one multiscale level, if present
pub(crate) fn multiscale_level(store: &StoreHandle, level: u32) -> Result<StoreHandle, CopickError> {
    if multiscale_levels(store)?.contains(&level) {
        Ok(store.child(&level.to_string()))
    } else {
        Err(CopickError::NotFound(format!(
            "multiscale level {} in {}",
            level,
            store.root()
        )))
    }
}

/// Scope holding every run
pub(crate) fn runs_scope() -> Scope {
    Scope::new(crate::codec::keys::RUNS_DIR)
}
