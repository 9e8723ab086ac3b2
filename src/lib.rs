//! Talawa Plugin Store
//!
//! Ingestion and lifecycle of admin plugins: archive validation, installation,
//! catalog registration, runtime activation and uninstallation, plus the
//! merged plugin list shown to administrators.

pub mod archive;
pub mod cli;
pub mod config;
pub mod details;
pub mod installer;
pub mod lifecycle;
pub mod notify;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod upload;
pub mod utils;
pub mod view;

pub use archive::{ArchiveError, ArchiveStructure, ArchiveValidator, Component, SelectedArchive};
pub use config::Config;
pub use details::{DetailsError, PluginDetails};
pub use installer::{InstallResult, PluginFileRemover, PluginFileService, PluginInstaller};
pub use lifecycle::{LifecycleController, LifecycleError, UninstallMode, UninstallReport};
pub use notify::{Notification, NotificationLevel, Notifier, TracingNotifier};
pub use upload::{UploadSession, UploadState};
pub use view::{DisplayPluginEntry, PluginFilter, PluginListView, PluginPage, ViewState};

use plugin_catalog::{CatalogError, FileCatalog, PluginCatalog};
use plugin_manifest::PluginManifest;
use plugin_runtime::{LocalPluginRuntime, PluginRuntime, RuntimeStatus};
use std::sync::Arc;
use tracing::{info, warn};

/// Main application context wiring the pipeline together
pub struct PluginStore {
    config: Config,
    catalog: Arc<dyn PluginCatalog>,
    runtime: Arc<dyn PluginRuntime>,
    files: Arc<PluginFileService>,
    notifier: Arc<dyn Notifier>,
    validator: ArchiveValidator,
    installer: PluginInstaller,
    lifecycle: LifecycleController,
    upload: UploadSession,
}

impl PluginStore {
    /// Create a store from configuration, notifying through the log
    pub async fn new(config: Config) -> PluginStoreResult<Self> {
        Self::with_notifier(config, Arc::new(TracingNotifier)).await
    }

    /// Create a store with the file catalog and local runtime the config describes
    pub async fn with_notifier(
        config: Config,
        notifier: Arc<dyn Notifier>,
    ) -> PluginStoreResult<Self> {
        config
            .validate()
            .map_err(|e| PluginStoreError::Config(e.to_string()))?;

        let catalog_path = config.catalog_path().map_err(config_error)?;
        let catalog: Arc<dyn PluginCatalog> = match catalog_path {
            Some(path) => {
                info!("Opening plugin catalog {:?}", path);
                Arc::new(FileCatalog::open(path).await?)
            }
            None => {
                info!("Using in-memory plugin catalog");
                Arc::new(FileCatalog::in_memory())
            }
        };

        let runtime: Arc<dyn PluginRuntime> = Arc::new(LocalPluginRuntime::new(vec![
            config.admin_dir().map_err(config_error)?,
            config.api_dir().map_err(config_error)?,
        ]));

        Self::with_components(config, catalog, runtime, notifier)
    }

    /// Create a store over explicit catalog and runtime implementations
    pub fn with_components(
        config: Config,
        catalog: Arc<dyn PluginCatalog>,
        runtime: Arc<dyn PluginRuntime>,
        notifier: Arc<dyn Notifier>,
    ) -> PluginStoreResult<Self> {
        let files = Arc::new(PluginFileService::new(
            config.admin_dir().map_err(config_error)?,
            config.api_dir().map_err(config_error)?,
        ));
        let installer = PluginInstaller::new(Arc::clone(&files), Arc::clone(&catalog));
        let lifecycle = LifecycleController::new(
            Arc::clone(&catalog),
            Arc::clone(&runtime),
            files.clone(),
            Arc::clone(&notifier),
        );

        Ok(Self {
            config,
            catalog,
            runtime,
            files,
            notifier,
            validator: ArchiveValidator::new(),
            installer,
            lifecycle,
            upload: UploadSession::new(),
        })
    }

    /// Load every installed plugin into the runtime and restore its status.
    /// Returns the number of plugins loaded.
    pub async fn initialize(&self) -> PluginStoreResult<usize> {
        info!("Hydrating plugin runtime from catalog");

        let mut loaded = 0;
        for record in self.catalog.get_all_plugins().await? {
            if !record.is_installed {
                continue;
            }

            if !self.runtime.load_plugin(&record.plugin_id).await {
                warn!("Could not load installed plugin {}", record.plugin_id);
                continue;
            }
            loaded += 1;

            if record.is_activated
                && !self
                    .runtime
                    .toggle_plugin_status(&record.plugin_id, RuntimeStatus::Active)
                    .await
            {
                warn!("Could not activate plugin {}", record.plugin_id);
            }
        }

        info!("Loaded {} installed plugins", loaded);
        Ok(loaded)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn PluginCatalog> {
        &self.catalog
    }

    pub fn runtime(&self) -> &Arc<dyn PluginRuntime> {
        &self.runtime
    }

    pub fn files(&self) -> &PluginFileService {
        &self.files
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn installer(&self) -> &PluginInstaller {
        &self.installer
    }

    pub fn lifecycle(&self) -> &LifecycleController {
        &self.lifecycle
    }

    pub fn upload_session(&self) -> &UploadSession {
        &self.upload
    }

    /// Validate an archive without installing it
    pub async fn validate_archive(&self, bytes: Vec<u8>) -> PluginStoreResult<ArchiveStructure> {
        Ok(self.validator.validate(bytes).await?)
    }

    /// Select, validate and install an archive through the upload session.
    ///
    /// An invalid archive is an error. Install failures are reported in the
    /// returned result.
    pub async fn upload(&self, selected: SelectedArchive) -> PluginStoreResult<InstallResult> {
        self.upload
            .select(&self.validator, selected)
            .await
            .map_err(PluginStoreError::InvalidArchive)?;

        self.upload
            .install(&self.installer, self.notifier.as_ref())
            .await
            .ok_or_else(|| {
                PluginStoreError::Install("Upload session has no archive to install".to_string())
            })
    }

    /// Current merged plugin list with the configured page size
    pub async fn list_view(&self) -> PluginStoreResult<PluginListView> {
        let runtime = self.runtime.loaded_plugins().await;
        let records = self.catalog.get_all_plugins().await?;
        Ok(PluginListView::new(
            runtime,
            records,
            ViewState::new(self.config.view.page_size),
        ))
    }

    /// Manifests of the plugins installed on disk for a component
    pub fn installed_plugins(&self, component: Component) -> Vec<PluginManifest> {
        self.files.list_installed(component)
    }

    /// Detail page data for an installed plugin
    pub async fn plugin_details(&self, plugin_id: &str) -> PluginStoreResult<PluginDetails> {
        Ok(details::read_details(&self.files, plugin_id).await?)
    }

    /// Debouncer for search input using the configured delay
    pub fn search_debouncer(&self) -> view::SearchDebouncer {
        view::SearchDebouncer::new(self.config.search_debounce())
    }
}

fn config_error(error: anyhow::Error) -> PluginStoreError {
    PluginStoreError::Config(error.to_string())
}

/// Application error types
#[derive(thiserror::Error, Debug)]
pub enum PluginStoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Invalid plugin archive: {0}")]
    InvalidArchive(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Install failed: {0}")]
    Install(String),

    #[error(transparent)]
    Details(#[from] DetailsError),
}

/// Result type for the main application
pub type PluginStoreResult<T> = Result<T, PluginStoreError>;
