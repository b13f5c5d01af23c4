//! Copick: overlay-merged entity tree for cryo-ET datasets
//!
//! A project's data lives in two storage roots: a read-only *static* root
//! (a filesystem prefix, an object store or a remote dataset catalog) and a
//! writable *overlay* root. Listings merge both; every write lands on the
//! overlay.

pub mod address;
pub mod backend;
pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod logging;
pub mod overlay;

pub use address::EntityAddress;
pub use config::{ConfigLoader, CopickConfig, PickableObjectConfig};
pub use entity::{
    AnnotationFilter, Features, Mesh, PickableObject, Picks, Root, RootBuilder, Run,
    Segmentation, SegmentationFilter, Tomogram, VoxelSpacing,
};
pub use error::{BackendError, CopickError, KeyError};
pub use overlay::{MalformedEntry, Provenance};
