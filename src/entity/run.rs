//! Runs and their annotation collections

use crate::address::EntityAddress;
use crate::codec::keys::{MESHES_DIR, PICKS_DIR, SEGMENTATIONS_DIR};
use crate::codec::{MeshKey, PicksKey, RunKey, SegmentationKey, Spacing, VoxelSpacingKey};
use crate::entity::{
    runs_scope, AnnotationFilter, Context, Mesh, Picks, PicksFile, Segmentation,
    SegmentationFilter, VoxelSpacing,
};
use crate::error::CopickError;
use crate::overlay::{Payload, Provenance, Resolved, Scope};
use bytes::Bytes;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Run {
    ctx: Arc<Context>,
    resolved: Resolved<RunKey>,
    scope: Scope,
}

impl Run {
    pub(crate) fn new(ctx: Arc<Context>, resolved: Resolved<RunKey>) -> Self {
        let scope = resolved.child_scope(&runs_scope());
        Self {
            ctx,
            resolved,
            scope,
        }
    }

    pub fn name(&self) -> &str {
        &self.resolved.key.name
    }

    pub fn provenance(&self) -> Provenance {
        self.resolved.provenance
    }

    /// Directory of this run inside each backend
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    fn picks_scope(&self) -> Scope {
        self.scope.join(PICKS_DIR)
    }

    fn meshes_scope(&self) -> Scope {
        self.scope.join(MESHES_DIR)
    }

    fn segmentations_scope(&self) -> Scope {
        self.scope.join(SEGMENTATIONS_DIR)
    }

    // Voxel spacings

    pub fn voxel_spacings(&self) -> Result<Vec<VoxelSpacing>, CopickError> {
        Ok(self
            .ctx
            .engine
            .resolve_all::<VoxelSpacingKey>(&self.scope)?
            .into_iter()
            .map(|resolved| self.voxel_spacing(resolved))
            .collect())
    }

    pub fn get_voxel_spacing(&self, voxel_size: f64) -> Result<VoxelSpacing, CopickError> {
        let key = VoxelSpacingKey::new(Spacing::new(voxel_size)?);
        let resolved = self.ctx.engine.require(&self.scope, &key)?;
        Ok(self.voxel_spacing(resolved))
    }

    pub fn new_voxel_spacing(&self, voxel_size: f64) -> Result<VoxelSpacing, CopickError> {
        let key = VoxelSpacingKey::new(Spacing::new(voxel_size)?);
        let resolved = self.ctx.engine.create(&self.scope, &key, Payload::Directory)?;
        Ok(self.voxel_spacing(resolved))
    }

    pub fn delete_voxel_spacing(&self, voxel_size: f64) -> Result<(), CopickError> {
        let key = VoxelSpacingKey::new(Spacing::new(voxel_size)?);
        self.ctx.engine.delete(&self.scope, &key)?;
        Ok(())
    }

    fn voxel_spacing(&self, resolved: Resolved<VoxelSpacingKey>) -> VoxelSpacing {
        VoxelSpacing::new(Arc::clone(&self.ctx), self.name(), &self.scope, resolved)
    }

    // Picks

    pub fn picks(&self) -> Result<Vec<Picks>, CopickError> {
        self.get_picks(&AnnotationFilter::default())
    }

    pub fn get_picks(&self, filter: &AnnotationFilter) -> Result<Vec<Picks>, CopickError> {
        let scope = self.picks_scope();
        Ok(self
            .ctx
            .engine
            .resolve_all::<PicksKey>(&scope)?
            .into_iter()
            .filter(|r| filter.matches(&r.key.object_name, &r.key.user_id, &r.key.session_id))
            .map(|resolved| Picks::new(Arc::clone(&self.ctx), scope.clone(), resolved))
            .collect())
    }

    /// Create an empty picks document for a configured object
    pub fn new_picks(
        &self,
        object_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<Picks, CopickError> {
        self.ctx.require_object(object_name)?;
        let key = PicksKey::new(object_name, user_id, session_id);
        let document = PicksFile::empty(object_name, user_id, session_id, self.name());
        let payload = Payload::Document(Bytes::from(serde_json::to_vec_pretty(&document)?));

        let scope = self.picks_scope();
        let resolved = self.ctx.engine.create(&scope, &key, payload)?;
        Ok(Picks::new(Arc::clone(&self.ctx), scope, resolved))
    }

    pub fn delete_picks(
        &self,
        object_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), CopickError> {
        let key = PicksKey::new(object_name, user_id, session_id);
        self.ctx.engine.delete(&self.picks_scope(), &key)?;
        Ok(())
    }

    /// Picks matched by an `object:user/session` address
    pub fn resolve_picks(&self, address: &EntityAddress) -> Result<Vec<Picks>, CopickError> {
        Ok(self
            .picks()?
            .into_iter()
            .filter(|p| address.matches_picks(p.key()))
            .collect())
    }

    // Meshes

    pub fn meshes(&self) -> Result<Vec<Mesh>, CopickError> {
        self.get_meshes(&AnnotationFilter::default())
    }

    pub fn get_meshes(&self, filter: &AnnotationFilter) -> Result<Vec<Mesh>, CopickError> {
        let scope = self.meshes_scope();
        Ok(self
            .ctx
            .engine
            .resolve_all::<MeshKey>(&scope)?
            .into_iter()
            .filter(|r| filter.matches(&r.key.object_name, &r.key.user_id, &r.key.session_id))
            .map(|resolved| Mesh::new(Arc::clone(&self.ctx), scope.clone(), resolved))
            .collect())
    }

    /// Create a mesh from a binary scene document
    pub fn new_mesh(
        &self,
        object_name: &str,
        user_id: &str,
        session_id: &str,
        scene: &[u8],
    ) -> Result<Mesh, CopickError> {
        self.ctx.require_object(object_name)?;
        let key = MeshKey::new(object_name, user_id, session_id);
        let scope = self.meshes_scope();
        let resolved = self.ctx.engine.create(
            &scope,
            &key,
            Payload::Document(Bytes::copy_from_slice(scene)),
        )?;
        Ok(Mesh::new(Arc::clone(&self.ctx), scope, resolved))
    }

    pub fn delete_mesh(
        &self,
        object_name: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<(), CopickError> {
        let key = MeshKey::new(object_name, user_id, session_id);
        self.ctx.engine.delete(&self.meshes_scope(), &key)?;
        Ok(())
    }

    // Segmentations

    pub fn segmentations(&self) -> Result<Vec<Segmentation>, CopickError> {
        self.get_segmentations(&SegmentationFilter::default())
    }

    pub fn get_segmentations(
        &self,
        filter: &SegmentationFilter,
    ) -> Result<Vec<Segmentation>, CopickError> {
        let scope = self.segmentations_scope();
        Ok(self
            .ctx
            .engine
            .resolve_all::<SegmentationKey>(&scope)?
            .into_iter()
            .filter(|r| filter.matches(&r.key))
            .map(|resolved| Segmentation::new(Arc::clone(&self.ctx), scope.clone(), resolved))
            .collect())
    }

    /// Create an empty segmentation store
    ///
    /// Single-label segmentations must be named after a configured object.
    pub fn new_segmentation(
        &self,
        voxel_size: f64,
        name: &str,
        user_id: &str,
        session_id: &str,
        is_multilabel: bool,
    ) -> Result<Segmentation, CopickError> {
        if !is_multilabel {
            self.ctx.require_object(name)?;
        }
        let key = SegmentationKey::new(
            Spacing::new(voxel_size)?,
            name,
            user_id,
            session_id,
            is_multilabel,
        );
        let scope = self.segmentations_scope();
        let resolved = self
            .ctx
            .engine
            .create(&scope, &key, Payload::Store(Vec::new()))?;
        Ok(Segmentation::new(Arc::clone(&self.ctx), scope, resolved))
    }

    pub fn delete_segmentation(&self, key: &SegmentationKey) -> Result<(), CopickError> {
        self.ctx.engine.delete(&self.segmentations_scope(), key)?;
        Ok(())
    }

    /// Segmentations matched by a `name:user/session[@spacing]` address
    pub fn resolve_segmentations(
        &self,
        address: &EntityAddress,
    ) -> Result<Vec<Segmentation>, CopickError> {
        Ok(self
            .segmentations()?
            .into_iter()
            .filter(|s| address.matches_segmentation(s.key()))
            .collect())
    }

    /// Re-list this run's subtree on next access
    pub fn refresh(&self) {
        self.ctx.engine.refresh(Some(&self.scope));
    }
}
