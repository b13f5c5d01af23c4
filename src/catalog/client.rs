//! Catalog clients

use crate::backend::FsArgs;
use crate::error::BackendError;
use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://graphql.cryoetdataportal.cziscience.com/graphql";

const CATALOG_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CATALOG_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: i64,
    pub name: String,
    pub dataset_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomogramRecord {
    pub id: i64,
    pub run_id: i64,
    pub voxel_spacing: f64,
    pub reconstruction_method: String,
    pub processing: String,
    /// Base URL of the OME-Zarr store
    pub https_omezarr_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationFileRecord {
    pub id: i64,
    pub annotation_id: i64,
    pub run_id: i64,
    pub object_name: String,
    /// Ontology identifier, e.g. `GO:0022626`
    pub object_id: String,
    /// `Point`, `OrientedPoint`, `SegmentationMask`, ...
    pub shape_type: String,
    pub format: String,
    pub https_path: String,
    /// Spacing the file's coordinates are expressed in
    pub voxel_spacing: f64,
}

impl AnnotationFileRecord {
    /// Whether this file holds point annotations we can convert to picks
    pub fn is_point_file(&self) -> bool {
        matches!(self.shape_type.as_str(), "Point" | "OrientedPoint") && self.format == "ndjson"
    }
}

/// Record source for [`CatalogBackend`](super::CatalogBackend)
pub trait CatalogClient: Send + Sync {
    fn name(&self) -> &str;

    fn runs(&self, dataset_ids: &[i64]) -> Result<Vec<RunRecord>, BackendError>;

    fn tomograms(&self, run_id: i64) -> Result<Vec<TomogramRecord>, BackendError>;

    fn annotation_files(&self, run_id: i64) -> Result<Vec<AnnotationFileRecord>, BackendError>;

    /// Download one file by URL
    fn fetch(&self, url: &str) -> Result<Bytes, BackendError>;
}

// GraphQL documents

const RUNS_QUERY: &str = r#"
query Runs($datasetIds: [Int!]) {
  runs(where: { datasetId: { _in: $datasetIds } }) { id name datasetId }
}"#;

const TOMOGRAMS_QUERY: &str = r#"
query Tomograms($runId: Int!) {
  tomograms(where: { runId: { _eq: $runId } }) {
    id runId voxelSpacing reconstructionMethod processing httpsOmezarrDir
  }
}"#;

const ANNOTATION_FILES_QUERY: &str = r#"
query AnnotationFiles($runId: Int!) {
  annotationFiles(where: { annotationShape: { annotation: { runId: { _eq: $runId } } } }) {
    id format httpsPath
    tomogramVoxelSpacing { voxelSpacing }
    annotationShape { shapeType annotation { id objectName objectId } }
  }
}"#;

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct RunsData {
    runs: Vec<RunRecord>,
}

#[derive(Deserialize)]
struct TomogramsData {
    tomograms: Vec<TomogramRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TomogramRow {
    id: i64,
    run_id: i64,
    voxel_spacing: f64,
    reconstruction_method: String,
    processing: String,
    https_omezarr_dir: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationFilesData {
    annotation_files: Vec<AnnotationFileRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationFileRow {
    id: i64,
    format: String,
    https_path: String,
    tomogram_voxel_spacing: Option<SpacingRow>,
    annotation_shape: ShapeRow,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpacingRow {
    voxel_spacing: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeRow {
    shape_type: String,
    annotation: AnnotationRow,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationRow {
    id: i64,
    object_name: String,
    object_id: String,
}

/// GraphQL client for the public cryo-ET data portal
pub struct HttpCatalogClient {
    client: Client,
    endpoint: String,
}

impl HttpCatalogClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, BackendError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .connect_timeout(CATALOG_CONNECT_TIMEOUT)
            .timeout(CATALOG_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::unavailable(&endpoint, format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }

    /// Honours `endpoint`; other keys are ignored
    pub fn from_fs_args(args: &FsArgs) -> Result<Self, BackendError> {
        let endpoint = args
            .get("endpoint")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_ENDPOINT);
        Self::new(endpoint)
    }

    fn query<T: DeserializeOwned>(&self, document: &str, variables: serde_json::Value) -> Result<T, BackendError> {
        debug!(endpoint = %self.endpoint, "Querying catalog");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "query": document, "variables": variables }))
            .send()
            .map_err(|e| map_http_error(&self.endpoint, e))?
            .error_for_status()
            .map_err(|e| map_http_error(&self.endpoint, e))?;
        let body: GraphQlResponse<T> = response
            .json()
            .map_err(|e| BackendError::unavailable(&self.endpoint, format!("invalid response: {}", e)))?;
        if let Some(error) = body.errors.first() {
            return Err(BackendError::unavailable(&self.endpoint, &error.message));
        }
        body.data
            .ok_or_else(|| BackendError::unavailable(&self.endpoint, "response carried no data"))
    }
}

fn map_http_error(endpoint: &str, error: reqwest::Error) -> BackendError {
    match error.status() {
        Some(StatusCode::NOT_FOUND) => BackendError::NotFound(
            error
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| endpoint.to_string()),
        ),
        Some(status) => BackendError::unavailable(endpoint, format!("request failed with status {}", status)),
        None if error.is_timeout() => BackendError::unavailable(endpoint, format!("request timeout: {}", error)),
        None if error.is_connect() => BackendError::unavailable(endpoint, format!("connection error: {}", error)),
        None => BackendError::unavailable(endpoint, format!("HTTP error: {}", error)),
    }
}

impl CatalogClient for HttpCatalogClient {
    fn name(&self) -> &str {
        &self.endpoint
    }

    fn runs(&self, dataset_ids: &[i64]) -> Result<Vec<RunRecord>, BackendError> {
        let data: RunsData = self.query(RUNS_QUERY, json!({ "datasetIds": dataset_ids }))?;
        Ok(data.runs)
    }

    fn tomograms(&self, run_id: i64) -> Result<Vec<TomogramRecord>, BackendError> {
        let data: TomogramsData = self.query(TOMOGRAMS_QUERY, json!({ "runId": run_id }))?;
        Ok(data
            .tomograms
            .into_iter()
            .filter_map(|row| {
                Some(TomogramRecord {
                    id: row.id,
                    run_id: row.run_id,
                    voxel_spacing: row.voxel_spacing,
                    reconstruction_method: row.reconstruction_method,
                    processing: row.processing,
                    https_omezarr_dir: row.https_omezarr_dir?,
                })
            })
            .collect())
    }

    fn annotation_files(&self, run_id: i64) -> Result<Vec<AnnotationFileRecord>, BackendError> {
        let data: AnnotationFilesData =
            self.query(ANNOTATION_FILES_QUERY, json!({ "runId": run_id }))?;
        Ok(data
            .annotation_files
            .into_iter()
            .filter_map(|row| {
                let voxel_spacing = row.tomogram_voxel_spacing?.voxel_spacing;
                let annotation = row.annotation_shape.annotation;
                Some(AnnotationFileRecord {
                    id: row.id,
                    annotation_id: annotation.id,
                    run_id,
                    object_name: annotation.object_name,
                    object_id: annotation.object_id,
                    shape_type: row.annotation_shape.shape_type,
                    format: row.format,
                    https_path: row.https_path,
                    voxel_spacing,
                })
            })
            .collect())
    }

    fn fetch(&self, url: &str) -> Result<Bytes, BackendError> {
        debug!(url, "Fetching catalog file");
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map_err(|e| map_http_error(url, e))
    }
}

/// Catalog held in memory, for tests and offline mirrors
#[derive(Default)]
pub struct InMemoryCatalog {
    runs: Vec<RunRecord>,
    tomograms: Vec<TomogramRecord>,
    annotation_files: Vec<AnnotationFileRecord>,
    files: HashMap<String, Bytes>,
    run_queries: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(mut self, record: RunRecord) -> Self {
        self.runs.push(record);
        self
    }

    pub fn with_tomogram(mut self, record: TomogramRecord) -> Self {
        self.tomograms.push(record);
        self
    }

    pub fn with_annotation_file(mut self, record: AnnotationFileRecord) -> Self {
        self.annotation_files.push(record);
        self
    }

    /// Content served for `url`
    pub fn with_file(mut self, url: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.files.insert(url.into(), data.into());
        self
    }

    /// Number of `runs` queries answered so far
    pub fn run_queries(&self) -> usize {
        self.run_queries.load(Ordering::Relaxed)
    }
}

impl CatalogClient for InMemoryCatalog {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn runs(&self, dataset_ids: &[i64]) -> Result<Vec<RunRecord>, BackendError> {
        self.run_queries.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .runs
            .iter()
            .filter(|r| dataset_ids.contains(&r.dataset_id))
            .cloned()
            .collect())
    }

    fn tomograms(&self, run_id: i64) -> Result<Vec<TomogramRecord>, BackendError> {
        Ok(self
            .tomograms
            .iter()
            .filter(|t| t.run_id == run_id)
            .cloned()
            .collect())
    }

    fn annotation_files(&self, run_id: i64) -> Result<Vec<AnnotationFileRecord>, BackendError> {
        Ok(self
            .annotation_files
            .iter()
            .filter(|a| a.run_id == run_id)
            .cloned()
            .collect())
    }

    fn fetch(&self, url: &str) -> Result<Bytes, BackendError> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(url.to_string()))
    }
}
