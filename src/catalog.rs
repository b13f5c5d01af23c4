//! Remote Catalog Adapter
//!
//! Serves the static half of a project from a remote dataset catalog instead of
//! a storage prefix. [`CatalogClient`] fetches run, tomogram and annotation
//! records; [`CatalogBackend`] lays them out as the same directory tree a
//! filesystem project has, so the merge engine sees no difference.

pub mod backend;
pub mod client;

pub use backend::CatalogBackend;
pub use client::{
    AnnotationFileRecord, CatalogClient, HttpCatalogClient, InMemoryCatalog, RunRecord,
    TomogramRecord, DEFAULT_ENDPOINT,
};
