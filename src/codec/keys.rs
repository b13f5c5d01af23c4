//! Key types for every entity kind and their storage grammars

use crate::codec::{
    validate_component, validate_length, validate_run_name, EntityKey, Spacing, SEPARATOR,
};
use crate::error::KeyError;
use std::fmt;

/// Extension of multiscale and volume stores
pub const STORE_EXT: &str = ".zarr";
/// Extension of picks documents
pub const PICKS_EXT: &str = ".json";
/// Extension of mesh scene documents
pub const MESH_EXT: &str = ".glb";
/// Directory prefix of voxel spacing directories
pub const VOXEL_SPACING_PREFIX: &str = "VoxelSpacing";
/// Suffix marking a multilabel segmentation
pub const MULTILABEL_SUFFIX: &str = "-multilabel";
/// Suffix (before the extension) marking a features store
pub const FEATURES_SUFFIX: &str = "_features";

/// Top-level directory holding runs
pub const RUNS_DIR: &str = "ExperimentRuns";
/// Top-level directory holding pickable object reference volumes
pub const OBJECTS_DIR: &str = "Objects";
pub const PICKS_DIR: &str = "Picks";
pub const MESHES_DIR: &str = "Meshes";
pub const SEGMENTATIONS_DIR: &str = "Segmentations";

/// Directories inside a run that are not voxel spacings
pub const RUN_COLLECTIONS: &[&str] = &[PICKS_DIR, MESHES_DIR, SEGMENTATIONS_DIR];

fn split_exact<'a>(name: &'a str, stem: &'a str, n: usize) -> Result<Vec<&'a str>, KeyError> {
    let parts: Vec<&str> = stem.split(SEPARATOR).collect();
    if parts.len() != n {
        return Err(KeyError::undecodable(
            name,
            format!("expected {} '{}'-separated components, found {}", n, SEPARATOR, parts.len()),
        ));
    }
    Ok(parts)
}

fn strip_ext<'a>(name: &'a str, ext: &str) -> Result<&'a str, KeyError> {
    name.strip_suffix(ext)
        .ok_or_else(|| KeyError::undecodable(name, format!("missing '{}' extension", ext)))
}

fn checked<K: EntityKey>(name: &str, key: K) -> Result<Option<K>, KeyError> {
    key.validate()
        .map_err(|e| KeyError::undecodable(name, e.to_string()))?;
    Ok(Some(key))
}

/// Run identity: the run directory name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunKey {
    pub name: String,
}

impl RunKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EntityKey for RunKey {
    const KIND: &'static str = "run";

    fn encode(&self) -> String {
        self.name.clone()
    }

    fn decode(name: &str) -> Result<Option<Self>, KeyError> {
        validate_run_name(name).map_err(|e| KeyError::undecodable(name, e.to_string()))?;
        Ok(Some(RunKey::new(name)))
    }

    fn validate(&self) -> Result<(), KeyError> {
        validate_run_name(&self.name)
    }
}

/// Voxel spacing identity: `VoxelSpacing{canonical}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VoxelSpacingKey {
    pub spacing: Spacing,
}

impl VoxelSpacingKey {
    pub fn new(spacing: Spacing) -> Self {
        Self { spacing }
    }
}

impl EntityKey for VoxelSpacingKey {
    const KIND: &'static str = "voxel_spacing";

    fn encode(&self) -> String {
        format!("{}{}", VOXEL_SPACING_PREFIX, self.spacing.canonical())
    }

    fn decode(name: &str) -> Result<Option<Self>, KeyError> {
        if RUN_COLLECTIONS.contains(&name) {
            return Ok(None);
        }
        let value = name.strip_prefix(VOXEL_SPACING_PREFIX).ok_or_else(|| {
            KeyError::undecodable(name, format!("missing '{}' prefix", VOXEL_SPACING_PREFIX))
        })?;
        let spacing =
            Spacing::parse(value).map_err(|e| KeyError::undecodable(name, e.to_string()))?;
        Ok(Some(VoxelSpacingKey::new(spacing)))
    }

    fn validate(&self) -> Result<(), KeyError> {
        Ok(())
    }
}

/// Tomogram identity: `{tomo_type}.zarr`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TomogramKey {
    pub tomo_type: String,
}

impl TomogramKey {
    pub fn new(tomo_type: impl Into<String>) -> Self {
        Self {
            tomo_type: tomo_type.into(),
        }
    }
}

impl EntityKey for TomogramKey {
    const KIND: &'static str = "tomogram";

    fn encode(&self) -> String {
        format!("{}{}", self.tomo_type, STORE_EXT)
    }

    fn decode(name: &str) -> Result<Option<Self>, KeyError> {
        let stem = strip_ext(name, STORE_EXT)?;
        if stem.ends_with(FEATURES_SUFFIX) {
            return Ok(None);
        }
        checked(name, TomogramKey::new(stem))
    }

    fn validate(&self) -> Result<(), KeyError> {
        validate_component("tomo_type", &self.tomo_type, false)?;
        validate_length(&self.encode())
    }
}

/// Features identity: `{tomo_type}_{feature_type}_features.zarr`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeaturesKey {
    pub tomo_type: String,
    pub feature_type: String,
}

impl FeaturesKey {
    pub fn new(tomo_type: impl Into<String>, feature_type: impl Into<String>) -> Self {
        Self {
            tomo_type: tomo_type.into(),
            feature_type: feature_type.into(),
        }
    }
}

impl EntityKey for FeaturesKey {
    const KIND: &'static str = "features";

    fn encode(&self) -> String {
        format!(
            "{}{}{}{}{}",
            self.tomo_type, SEPARATOR, self.feature_type, FEATURES_SUFFIX, STORE_EXT
        )
    }

    fn decode(name: &str) -> Result<Option<Self>, KeyError> {
        let stem = match name
            .strip_suffix(STORE_EXT)
            .and_then(|s| s.strip_suffix(FEATURES_SUFFIX))
        {
            Some(stem) => stem,
            None => return Ok(None),
        };
        let parts = split_exact(name, stem, 2)?;
        checked(name, FeaturesKey::new(parts[0], parts[1]))
    }

    fn validate(&self) -> Result<(), KeyError> {
        validate_component("tomo_type", &self.tomo_type, false)?;
        validate_component("feature_type", &self.feature_type, false)?;
        validate_length(&self.encode())
    }
}

/// Picks identity: `{user_id}_{session_id}_{object_name}.json`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PicksKey {
    pub user_id: String,
    pub session_id: String,
    pub object_name: String,
}

impl PicksKey {
    pub fn new(
        object_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            object_name: object_name.into(),
        }
    }
}

fn validate_annotation(user_id: &str, session_id: &str, object_name: &str) -> Result<(), KeyError> {
    validate_component("user_id", user_id, false)?;
    validate_component("session_id", session_id, true)?;
    validate_component("object_name", object_name, false)
}

impl EntityKey for PicksKey {
    const KIND: &'static str = "picks";

    fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{}",
            self.user_id,
            self.session_id,
            self.object_name,
            PICKS_EXT,
            sep = SEPARATOR
        )
    }

    fn decode(name: &str) -> Result<Option<Self>, KeyError> {
        let stem = strip_ext(name, PICKS_EXT)?;
        let parts = split_exact(name, stem, 3)?;
        checked(name, PicksKey::new(parts[2], parts[0], parts[1]))
    }

    fn validate(&self) -> Result<(), KeyError> {
        validate_annotation(&self.user_id, &self.session_id, &self.object_name)?;
        validate_length(&self.encode())
    }
}

/// Mesh identity: `{user_id}_{session_id}_{object_name}.glb`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshKey {
    pub user_id: String,
    pub session_id: String,
    pub object_name: String,
}

impl MeshKey {
    pub fn new(
        object_name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
            object_name: object_name.into(),
        }
    }
}

impl EntityKey for MeshKey {
    const KIND: &'static str = "mesh";

    fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{}",
            self.user_id,
            self.session_id,
            self.object_name,
            MESH_EXT,
            sep = SEPARATOR
        )
    }

    fn decode(name: &str) -> Result<Option<Self>, KeyError> {
        let stem = strip_ext(name, MESH_EXT)?;
        let parts = split_exact(name, stem, 3)?;
        checked(name, MeshKey::new(parts[2], parts[0], parts[1]))
    }

    fn validate(&self) -> Result<(), KeyError> {
        validate_annotation(&self.user_id, &self.session_id, &self.object_name)?;
        validate_length(&self.encode())
    }
}

/// Segmentation identity:
/// `{voxel_spacing}_{user_id}_{session_id}_{name}[-multilabel].zarr`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentationKey {
    pub voxel_spacing: Spacing,
    pub user_id: String,
    pub session_id: String,
    pub name: String,
    pub is_multilabel: bool,
}

impl SegmentationKey {
    pub fn new(
        voxel_spacing: Spacing,
        name: impl Into<String>,
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        is_multilabel: bool,
    ) -> Self {
        Self {
            voxel_spacing,
            user_id: user_id.into(),
            session_id: session_id.into(),
            name: name.into(),
            is_multilabel,
        }
    }
}

impl EntityKey for SegmentationKey {
    const KIND: &'static str = "segmentation";

    fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}{}{}",
            self.voxel_spacing.canonical(),
            self.user_id,
            self.session_id,
            self.name,
            if self.is_multilabel { MULTILABEL_SUFFIX } else { "" },
            STORE_EXT,
            sep = SEPARATOR
        )
    }

    fn decode(name: &str) -> Result<Option<Self>, KeyError> {
        let stem = strip_ext(name, STORE_EXT)?;
        let parts = split_exact(name, stem, 4)?;
        let spacing =
            Spacing::parse(parts[0]).map_err(|e| KeyError::undecodable(name, e.to_string()))?;
        let (seg_name, is_multilabel) = match parts[3].strip_suffix(MULTILABEL_SUFFIX) {
            Some(base) => (base, true),
            None => (parts[3], false),
        };
        checked(
            name,
            SegmentationKey::new(spacing, seg_name, parts[1], parts[2], is_multilabel),
        )
    }

    fn validate(&self) -> Result<(), KeyError> {
        validate_component("user_id", &self.user_id, false)?;
        validate_component("session_id", &self.session_id, true)?;
        validate_component("segmentation name", &self.name, false)?;
        if self.name.ends_with(MULTILABEL_SUFFIX) {
            return Err(KeyError::Illegal {
                component: "segmentation name",
                value: self.name.clone(),
                reason: "the '-multilabel' suffix is reserved for the multilabel flag",
            });
        }
        validate_length(&self.encode())
    }
}

/// Pickable object reference volume: `Objects/{name}.zarr`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub name: String,
}

impl ObjectKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl EntityKey for ObjectKey {
    const KIND: &'static str = "object";

    fn encode(&self) -> String {
        format!("{}{}", self.name, STORE_EXT)
    }

    fn decode(name: &str) -> Result<Option<Self>, KeyError> {
        let stem = strip_ext(name, STORE_EXT)?;
        checked(name, ObjectKey::new(stem))
    }

    fn validate(&self) -> Result<(), KeyError> {
        validate_component("object_name", &self.name, false)?;
        validate_length(&self.encode())
    }
}

impl fmt::Display for PicksKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.object_name, self.user_id, self.session_id)
    }
}

impl fmt::Display for MeshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.object_name, self.user_id, self.session_id)
    }
}

impl fmt::Display for SegmentationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}@{}",
            self.name, self.user_id, self.session_id, self.voxel_spacing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spacing(v: f64) -> Spacing {
        Spacing::new(v).unwrap()
    }

    #[test]
    fn test_picks_grammar() {
        let key = PicksKey::new("ribosome", "user1", "0");
        assert_eq!(key.encode(), "user1_0_ribosome.json");
        assert_eq!(PicksKey::decode("user1_0_ribosome.json").unwrap(), Some(key));
    }

    #[test]
    fn test_picks_empty_session() {
        let key = PicksKey::new("ribosome", "user1", "");
        assert_eq!(key.encode(), "user1__ribosome.json");
        assert_eq!(PicksKey::decode(&key.encode()).unwrap(), Some(key));
    }

    #[test]
    fn test_picks_malformed_names() {
        for name in [
            "garbage.txt",
            "user1_ribosome.json",
            "a_b_c_d.json",
            "_0_ribosome.json",
            "user1_0_.json",
        ] {
            assert!(PicksKey::decode(name).is_err(), "{} should not decode", name);
        }
    }

    #[test]
    fn test_mesh_grammar() {
        let key = MeshKey::new("membrane", "tool", "1");
        assert_eq!(key.encode(), "tool_1_membrane.glb");
        assert_eq!(MeshKey::decode("tool_1_membrane.glb").unwrap(), Some(key));
        assert!(MeshKey::decode("tool_1_membrane.json").is_err());
    }

    #[test]
    fn test_segmentation_grammar() {
        let key = SegmentationKey::new(spacing(10.0), "membrane", "user1", "0", false);
        assert_eq!(key.encode(), "10.000_user1_0_membrane.zarr");
        assert_eq!(SegmentationKey::decode(&key.encode()).unwrap(), Some(key));

        let multi = SegmentationKey::new(spacing(7.84), "labels", "tool", "3", true);
        assert_eq!(multi.encode(), "7.840_tool_3_labels-multilabel.zarr");
        assert_eq!(SegmentationKey::decode(&multi.encode()).unwrap(), Some(multi));
    }

    #[test]
    fn test_segmentation_rejects_reserved_suffix_in_name() {
        let key = SegmentationKey::new(spacing(10.0), "labels-multilabel", "u", "0", false);
        assert!(key.validate().is_err());
    }

    #[test]
    fn test_voxel_spacing_grammar() {
        let key = VoxelSpacingKey::new(spacing(10.0));
        assert_eq!(key.encode(), "VoxelSpacing10.000");
        assert_eq!(VoxelSpacingKey::decode("VoxelSpacing10.000").unwrap(), Some(key));
        // Non-canonical names resolve to the same identity
        assert_eq!(VoxelSpacingKey::decode("VoxelSpacing10.0").unwrap(), Some(key));
        assert_eq!(VoxelSpacingKey::decode("Picks").unwrap(), None);
        assert!(VoxelSpacingKey::decode("VoxelSpacingabc").is_err());
        assert!(VoxelSpacingKey::decode("notes.txt").is_err());
    }

    #[test]
    fn test_tomogram_and_features_share_directory() {
        assert_eq!(
            TomogramKey::decode("wbp.zarr").unwrap(),
            Some(TomogramKey::new("wbp"))
        );
        assert_eq!(TomogramKey::decode("wbp_sobel_features.zarr").unwrap(), None);
        assert_eq!(
            FeaturesKey::decode("wbp_sobel_features.zarr").unwrap(),
            Some(FeaturesKey::new("wbp", "sobel"))
        );
        assert_eq!(FeaturesKey::decode("wbp.zarr").unwrap(), None);
        assert!(TomogramKey::decode("wbp_x.zarr").is_err());
        assert!(TomogramKey::decode("tomo.mrc").is_err());
    }

    #[test]
    fn test_features_grammar() {
        let key = FeaturesKey::new("denoised", "cellcanvas01");
        assert_eq!(key.encode(), "denoised_cellcanvas01_features.zarr");
    }

    #[test]
    fn test_run_key_allows_underscores() {
        assert_eq!(RunKey::decode("TS_1").unwrap(), Some(RunKey::new("TS_1")));
        assert!(RunKey::decode(".DS_Store").is_err());
    }

    #[test]
    fn test_validate_rejects_separator_in_components() {
        assert!(PicksKey::new("ribo_some", "u", "0").validate().is_err());
        assert!(PicksKey::new("ribosome", "user_1", "0").validate().is_err());
        assert!(PicksKey::new("ribosome", "u", "0_1").validate().is_err());
        assert!(FeaturesKey::new("wbp", "a_b").validate().is_err());
        assert!(TomogramKey::new("wbp_denoised").validate().is_err());
    }

    #[test]
    fn test_maximal_length_names() {
        let user = "u".repeat(255 - "_0_ribosome.json".len());
        let key = PicksKey::new("ribosome", user.clone(), "0");
        assert_eq!(key.encode().len(), 255);
        assert!(key.validate().is_ok());
        assert_eq!(PicksKey::decode(&key.encode()).unwrap(), Some(key));

        let too_long = PicksKey::new("ribosome", format!("{}u", user), "0");
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_object_grammar() {
        assert_eq!(ObjectKey::new("ribosome").encode(), "ribosome.zarr");
        assert_eq!(
            ObjectKey::decode("ribosome.zarr").unwrap(),
            Some(ObjectKey::new("ribosome"))
        );
    }
}
