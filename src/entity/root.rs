//! Project root

use crate::backend::{Backend, BackendRegistry};
use crate::catalog::{CatalogBackend, CatalogClient, HttpCatalogClient};
use crate::codec::RunKey;
use crate::config::{validation_failure, ConfigType, CopickConfig};
use crate::entity::{runs_scope, Context, PickableObject, Run};
use crate::error::CopickError;
use crate::overlay::{MalformedEntry, OverlayEngine, Payload};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Top-level handle of a project, bound to one overlay and at most one static backend
#[derive(Debug, Clone)]
pub struct Root {
    ctx: Arc<Context>,
}

/// Assembles a [`Root`] from a configuration and optional pre-built backends
#[derive(Default)]
pub struct RootBuilder {
    config: CopickConfig,
    registry: Option<Arc<BackendRegistry>>,
    static_backend: Option<Arc<dyn Backend>>,
    overlay_backend: Option<Arc<dyn Backend>>,
    catalog: Option<Arc<dyn CatalogClient>>,
}

impl RootBuilder {
    pub fn config(mut self, config: CopickConfig) -> Self {
        self.config = config;
        self
    }

    /// Registry used to open `static_root` / `overlay_root` URIs
    pub fn registry(mut self, registry: Arc<BackendRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Use this backend as the static side instead of `static_root`
    pub fn static_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.static_backend = Some(backend);
        self
    }

    /// Use this backend as the overlay side instead of `overlay_root`
    pub fn overlay_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.overlay_backend = Some(backend);
        self
    }

    /// Catalog client for the `cryoet_data_portal` config type
    pub fn catalog_client(mut self, client: Arc<dyn CatalogClient>) -> Self {
        self.catalog = Some(client);
        self
    }

    pub fn build(self) -> Result<Root, CopickError> {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(BackendRegistry::new()));
        let config = self.config;

        let static_backend = match self.static_backend {
            Some(backend) => Some(backend),
            None => match config.config_type {
                ConfigType::Filesystem => match &config.static_root {
                    Some(uri) => Some(registry.open(uri, &config.static_fs_args)?),
                    None => None,
                },
                ConfigType::CryoetDataPortal => {
                    let client: Arc<dyn CatalogClient> = match self.catalog {
                        Some(client) => client,
                        None => Arc::new(HttpCatalogClient::from_fs_args(&config.static_fs_args)?),
                    };
                    let backend = CatalogBackend::new(
                        client,
                        config.dataset_ids.clone(),
                        config.pickable_objects.clone(),
                    );
                    Some(Arc::new(backend) as Arc<dyn Backend>)
                }
            },
        };

        let overlay_backend = match self.overlay_backend {
            Some(backend) => Some(backend),
            None => match &config.overlay_root {
                Some(uri) => Some(registry.open(uri, &config.overlay_fs_args)?),
                None => None,
            },
        };

        info!(
            project = config.name.as_deref().unwrap_or(""),
            static_backend = static_backend.as_ref().map(|b| b.name()).unwrap_or("none"),
            overlay_backend = overlay_backend.as_ref().map(|b| b.name()).unwrap_or("none"),
            objects = config.pickable_objects.len(),
            "Opened project root"
        );

        Ok(Root {
            ctx: Arc::new(Context {
                config,
                engine: OverlayEngine::new(static_backend, overlay_backend),
            }),
        })
    }
}

impl Root {
    pub fn builder() -> RootBuilder {
        RootBuilder::default()
    }

    /// Validate a configuration and open its backends
    pub fn from_config(config: CopickConfig) -> Result<Self, CopickError> {
        config.validate().map_err(|errors| validation_failure(&errors))?;
        Self::builder().config(config).build()
    }

    /// Load, validate and open a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CopickError> {
        Self::from_config(CopickConfig::from_file(path)?)
    }

    pub fn config(&self) -> &CopickConfig {
        &self.ctx.config
    }

    pub fn pickable_objects(&self) -> Vec<PickableObject> {
        self.ctx
            .config
            .pickable_objects
            .iter()
            .map(|object| PickableObject::new(Arc::clone(&self.ctx), object.clone()))
            .collect()
    }

    pub fn get_object(&self, name: &str) -> Option<PickableObject> {
        self.ctx
            .config
            .object(name)
            .map(|object| PickableObject::new(Arc::clone(&self.ctx), object.clone()))
    }

    pub fn runs(&self) -> Result<Vec<Run>, CopickError> {
        Ok(self
            .ctx
            .engine
            .resolve_all::<RunKey>(&runs_scope())?
            .into_iter()
            .map(|resolved| Run::new(Arc::clone(&self.ctx), resolved))
            .collect())
    }

    pub fn get_run(&self, name: &str) -> Result<Run, CopickError> {
        let resolved = self.ctx.engine.require(&runs_scope(), &RunKey::new(name))?;
        Ok(Run::new(Arc::clone(&self.ctx), resolved))
    }

    pub fn new_run(&self, name: &str) -> Result<Run, CopickError> {
        let resolved = self
            .ctx
            .engine
            .create(&runs_scope(), &RunKey::new(name), Payload::Directory)?;
        Ok(Run::new(Arc::clone(&self.ctx), resolved))
    }

    /// Delete a run's overlay content; static runs cannot be deleted
    pub fn delete_run(&self, name: &str) -> Result<(), CopickError> {
        self.ctx.engine.delete(&runs_scope(), &RunKey::new(name))?;
        Ok(())
    }

    /// Re-list both backends on next access
    pub fn refresh(&self) {
        self.ctx.engine.refresh(None);
    }

    /// Storage entries skipped so far because they could not be decoded
    pub fn diagnostics(&self) -> Vec<MalformedEntry> {
        self.ctx.engine.diagnostics().entries()
    }

    pub fn overlay(&self) -> Option<&Arc<dyn Backend>> {
        self.ctx.engine.overlay_backend()
    }

    pub fn static_backend(&self) -> Option<&Arc<dyn Backend>> {
        self.ctx.engine.static_backend()
    }

    pub fn engine(&self) -> &OverlayEngine {
        &self.ctx.engine
    }
}
