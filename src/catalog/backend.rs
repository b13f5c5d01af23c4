//! Read-only backend synthesised from catalog records

use crate::backend::{clean_path, join_path, Backend};
use crate::catalog::client::{AnnotationFileRecord, CatalogClient, TomogramRecord};
use crate::codec::keys::{PICKS_DIR, PICKS_EXT, RUNS_DIR, STORE_EXT, VOXEL_SPACING_PREFIX};
use crate::codec::{Spacing, SEPARATOR};
use crate::config::PickableObjectConfig;
use crate::entity::{CopickPoint, PicksFile};
use crate::error::BackendError;
use bytes::Bytes;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// User id of every picks document derived from the catalog
pub const PORTAL_USER: &str = "data-portal";

/// A picks document backed by one annotation file
#[derive(Debug, Clone)]
struct PicksSource {
    record: AnnotationFileRecord,
    object_name: String,
    run_name: String,
}

/// Directory tree derived from the catalog
#[derive(Debug, Default)]
struct Layout {
    dirs: BTreeMap<String, BTreeSet<String>>,
    stores: BTreeMap<String, String>,
    picks: BTreeMap<String, PicksSource>,
}

impl Layout {
    fn add_dir_entry(&mut self, parent: &str, name: &str) {
        let mut path = String::new();
        for segment in parent.split('/').filter(|s| !s.is_empty()) {
            self.dirs
                .entry(path.clone())
                .or_default()
                .insert(segment.to_string());
            path = join_path(&[&path, segment]);
        }
        self.dirs
            .entry(path)
            .or_default()
            .insert(name.to_string());
    }

    /// The store containing `path`, with the key relative to its root
    fn store_for<'a>(&self, path: &'a str) -> Option<(&String, &String, &'a str)> {
        let (root, url) = self
            .stores
            .range::<str, _>((Bound::Unbounded, Bound::Included(path)))
            .rev()
            .find(|(root, _)| {
                path == root.as_str()
                    || (path.starts_with(root.as_str()) && path[root.len()..].starts_with('/'))
            })?;
        let key = path[root.len()..].trim_start_matches('/');
        Some((root, url, key))
    }
}

/// Tomogram type for a catalog record: `{method}[-{processing}]`, lowercased
pub fn tomo_type(record: &TomogramRecord) -> String {
    let method = sanitize(&record.reconstruction_method);
    let processing = sanitize(&record.processing);
    if processing.is_empty() || processing == "raw" {
        method
    } else {
        format!("{}-{}", method, processing)
    }
}

fn sanitize(value: &str) -> String {
    let mapped: String = value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect();
    mapped.trim_matches(|c| c == '-' || c == '.').to_string()
}

/// Read-only view of one or more catalog datasets
///
/// The layout is fetched on first access and kept until [`Backend::refresh`].
pub struct CatalogBackend {
    name: String,
    client: Arc<dyn CatalogClient>,
    dataset_ids: Vec<i64>,
    objects: Vec<PickableObjectConfig>,
    layout: RwLock<Option<Arc<Layout>>>,
}

impl CatalogBackend {
    pub fn new(
        client: Arc<dyn CatalogClient>,
        dataset_ids: Vec<i64>,
        objects: Vec<PickableObjectConfig>,
    ) -> Self {
        let ids: Vec<String> = dataset_ids.iter().map(|id| id.to_string()).collect();
        Self {
            name: format!("catalog://{}/{}", client.name(), ids.join(",")),
            client,
            dataset_ids,
            objects,
            layout: RwLock::new(None),
        }
    }

    fn layout(&self) -> Result<Arc<Layout>, BackendError> {
        if let Some(layout) = self.layout.read().as_ref() {
            return Ok(Arc::clone(layout));
        }
        let layout = Arc::new(self.build_layout()?);
        *self.layout.write() = Some(Arc::clone(&layout));
        Ok(layout)
    }

    /// Configured object an annotation belongs to, by ontology id then by name
    fn object_for(&self, record: &AnnotationFileRecord) -> Option<&PickableObjectConfig> {
        self.objects
            .iter()
            .find(|o| o.identifier.as_deref() == Some(record.object_id.as_str()))
            .or_else(|| {
                self.objects
                    .iter()
                    .find(|o| o.name.eq_ignore_ascii_case(&record.object_name))
            })
    }

    fn build_layout(&self) -> Result<Layout, BackendError> {
        let mut layout = Layout::default();
        layout.dirs.entry(String::new()).or_default().insert(RUNS_DIR.to_string());
        layout.dirs.entry(RUNS_DIR.to_string()).or_default();

        let mut runs = self.client.runs(&self.dataset_ids)?;
        runs.sort_by_key(|r| r.id);
        let mut seen_runs = BTreeSet::new();

        for run in runs {
            if !seen_runs.insert(run.name.clone()) {
                warn!(run = %run.name, id = run.id, "Duplicate run name in catalog; keeping the first");
                continue;
            }
            let run_dir = join_path(&[RUNS_DIR, &run.name]);
            layout.add_dir_entry(RUNS_DIR, &run.name);
            layout.dirs.entry(run_dir.clone()).or_default();

            let mut tomograms = self.client.tomograms(run.id)?;
            tomograms.sort_by_key(|t| t.id);
            for tomogram in tomograms {
                let spacing = match Spacing::new(tomogram.voxel_spacing) {
                    Ok(spacing) => spacing,
                    Err(e) => {
                        warn!(tomogram = tomogram.id, error = %e, "Skipping tomogram with invalid voxel spacing");
                        continue;
                    }
                };
                let spacing_dir = join_path(&[
                    &run_dir,
                    &format!("{}{}", VOXEL_SPACING_PREFIX, spacing.canonical()),
                ]);
                let store_name = format!("{}{}", tomo_type(&tomogram), STORE_EXT);
                let store_path = join_path(&[&spacing_dir, &store_name]);
                if layout.stores.contains_key(&store_path) {
                    warn!(tomogram = tomogram.id, path = %store_path, "Duplicate tomogram type; keeping the first");
                    continue;
                }
                layout.add_dir_entry(&spacing_dir, &store_name);
                layout
                    .stores
                    .insert(store_path, tomogram.https_omezarr_dir.trim_end_matches('/').to_string());
            }

            let mut files = self.client.annotation_files(run.id)?;
            files.sort_by_key(|f| f.id);
            for record in files.into_iter().filter(|f| f.is_point_file()) {
                let Some(object) = self.object_for(&record) else {
                    debug!(annotation = record.annotation_id, object = %record.object_name, "No pickable object for annotation");
                    continue;
                };
                let file_name = format!(
                    "{}{sep}{}{sep}{}{}",
                    PORTAL_USER,
                    record.annotation_id,
                    object.name,
                    PICKS_EXT,
                    sep = SEPARATOR
                );
                let picks_dir = join_path(&[&run_dir, PICKS_DIR]);
                let path = join_path(&[&picks_dir, &file_name]);
                if layout.picks.contains_key(&path) {
                    continue;
                }
                layout.add_dir_entry(&picks_dir, &file_name);
                layout.picks.insert(
                    path,
                    PicksSource {
                        object_name: object.name.clone(),
                        run_name: run.name.clone(),
                        record,
                    },
                );
            }
        }

        info!(
            backend = %self.name,
            runs = seen_runs.len(),
            tomograms = layout.stores.len(),
            picks = layout.picks.len(),
            "Loaded catalog layout"
        );
        Ok(layout)
    }

    fn read_only(&self) -> BackendError {
        BackendError::ReadOnly(self.name.clone())
    }

    /// Child names inside a remote OME-Zarr store
    ///
    /// Remote stores cannot be listed; the multiscale levels are read from the
    /// group attributes instead.
    fn list_store(&self, url: &str, key: &str) -> Result<BTreeSet<String>, BackendError> {
        let mut names = BTreeSet::new();
        if key.is_empty() {
            let attrs = match self.client.fetch(&format!("{}/.zattrs", url)) {
                Ok(attrs) => attrs,
                Err(BackendError::NotFound(_)) => return Ok(names),
                Err(e) => return Err(e),
            };
            names.insert(".zattrs".to_string());
            names.extend(multiscale_paths(&attrs));
        } else if !key.contains('/') {
            names.insert(".zarray".to_string());
        }
        Ok(names)
    }

    fn render_picks(&self, source: &PicksSource) -> Result<Bytes, BackendError> {
        let raw = self.client.fetch(&source.record.https_path)?;
        let points = points_from_ndjson(&raw, source.record.voxel_spacing)
            .map_err(|e| invalid_data(&source.record.https_path, e))?;
        let document = PicksFile {
            pickable_object_name: source.object_name.clone(),
            user_id: PORTAL_USER.to_string(),
            session_id: source.record.annotation_id.to_string(),
            run_name: Some(source.run_name.clone()),
            voxel_spacing: None,
            unit: "angstrom".to_string(),
            points,
            trust_orientation: source.record.shape_type == "OrientedPoint",
        };
        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| invalid_data(&source.record.https_path, e.to_string()))?;
        Ok(Bytes::from(bytes))
    }
}

fn invalid_data(path: &str, reason: impl std::fmt::Display) -> BackendError {
    BackendError::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("{}: {}", path, reason),
    ))
}

#[derive(Deserialize)]
struct Multiscales {
    #[serde(default)]
    multiscales: Vec<Multiscale>,
}

#[derive(Deserialize)]
struct Multiscale {
    #[serde(default)]
    datasets: Vec<Dataset>,
}

#[derive(Deserialize)]
struct Dataset {
    path: String,
}

fn multiscale_paths(attrs: &[u8]) -> Vec<String> {
    serde_json::from_slice::<Multiscales>(attrs)
        .map(|m| {
            m.multiscales
                .into_iter()
                .flat_map(|s| s.datasets)
                .map(|d| d.path)
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Deserialize)]
struct NdjsonLocation {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Deserialize)]
struct NdjsonPoint {
    location: NdjsonLocation,
    #[serde(default)]
    xyz_rotation_matrix: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    instance_id: Option<i64>,
}

/// Convert catalog point annotations (voxel coordinates) to angstrom picks
pub fn points_from_ndjson(raw: &[u8], voxel_spacing: f64) -> Result<Vec<CopickPoint>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    let mut points = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: NdjsonPoint =
            serde_json::from_str(line).map_err(|e| format!("line {}: {}", index + 1, e))?;
        let mut point = CopickPoint::new(
            record.location.x * voxel_spacing,
            record.location.y * voxel_spacing,
            record.location.z * voxel_spacing,
        );
        if let Some(rotation) = record.xyz_rotation_matrix {
            for (row, values) in rotation.iter().enumerate() {
                point.transformation[row][..3].copy_from_slice(values);
            }
        }
        point.instance_id = record.instance_id.unwrap_or(0);
        points.push(point);
    }
    Ok(points)
}

impl Backend for CatalogBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn exists(&self, path: &str) -> Result<bool, BackendError> {
        let path = clean_path(path);
        let layout = self.layout()?;
        if layout.dirs.contains_key(path) || layout.picks.contains_key(path) {
            return Ok(true);
        }
        match layout.store_for(path) {
            Some((_, _, "")) => Ok(true),
            Some((_, url, key)) => match self.client.fetch(&format!("{}/{}", url, key)) {
                Ok(_) => Ok(true),
                Err(BackendError::NotFound(_)) => Ok(false),
                Err(e) => Err(e),
            },
            None => Ok(false),
        }
    }

    fn list(&self, prefix: &str) -> Result<BTreeSet<String>, BackendError> {
        let prefix = clean_path(prefix);
        let layout = self.layout()?;
        if let Some(children) = layout.dirs.get(prefix) {
            return Ok(children.clone());
        }
        match layout.store_for(prefix) {
            Some((_, url, key)) => self.list_store(url, key),
            None => Ok(BTreeSet::new()),
        }
    }

    fn get(&self, path: &str) -> Result<Bytes, BackendError> {
        let path = clean_path(path);
        let layout = self.layout()?;
        if let Some(source) = layout.picks.get(path) {
            return self.render_picks(source);
        }
        match layout.store_for(path) {
            Some((_, url, key)) if !key.is_empty() => self.client.fetch(&format!("{}/{}", url, key)),
            _ => Err(BackendError::NotFound(path.to_string())),
        }
    }

    fn put(&self, _path: &str, _data: &[u8]) -> Result<(), BackendError> {
        Err(self.read_only())
    }

    fn delete(&self, _path: &str) -> Result<(), BackendError> {
        Err(self.read_only())
    }

    fn makedirs(&self, _path: &str) -> Result<(), BackendError> {
        Err(self.read_only())
    }

    fn rename(&self, _from: &str, _to: &str) -> Result<(), BackendError> {
        Err(self.read_only())
    }

    /// Synthesised documents only; remote store contents cannot be enumerated
    fn walk(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let prefix = clean_path(prefix);
        let layout = self.layout()?;
        if let Some((root, _, _)) = layout.store_for(prefix) {
            return Err(BackendError::unavailable(
                &self.name,
                format!("remote store '{}' cannot be enumerated", root),
            ));
        }
        let under = |p: &str| prefix.is_empty() || p == prefix || p.starts_with(&format!("{}/", prefix));
        if let Some(root) = layout.stores.keys().find(|root| under(root)) {
            return Err(BackendError::unavailable(
                &self.name,
                format!("remote store '{}' cannot be enumerated", root),
            ));
        }
        Ok(layout.picks.keys().filter(|p| under(p)).cloned().collect())
    }

    fn refresh(&self) {
        *self.layout.write() = None;
        debug!(backend = %self.name, "Cleared catalog layout");
    }
}
