//! Plugin lifecycle: install, activate, deactivate and uninstall
//!
//! Each operation coordinates the catalog, the runtime and the plugin files,
//! and reports its outcome through the notifier. At most one operation runs
//! per plugin at a time.

use crate::installer::PluginFileRemover;
use crate::notify::{keys, Notification, Notifier};
use crate::utils::describe_error;
use plugin_catalog::{CatalogError, InstalledPluginRecord, PluginCatalog, PluginUpdate};
use plugin_runtime::{PluginRuntime, RuntimeStatus};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{error, info, warn};

/// Errors from lifecycle operations
#[derive(thiserror::Error, Debug)]
pub enum LifecycleError {
    #[error("Another operation is already running for plugin {0}")]
    Busy(String),

    #[error("Plugin {0} is not in the catalog")]
    NotFound(String),

    #[error("Plugin {0} is not installed")]
    NotInstalled(String),

    #[error("Plugin runtime rejected {operation} for plugin {plugin_id}")]
    RuntimeRejected {
        plugin_id: String,
        operation: &'static str,
    },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("No uninstall is pending confirmation")]
    NoPendingUninstall,
}

/// What to do with plugin data on uninstall
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallMode {
    /// Downgrade the catalog record and keep the files
    KeepData,
    /// Delete the catalog record and the files
    RemovePermanently,
}

/// What an uninstall actually did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UninstallReport {
    pub plugin_id: String,
    pub mode: UninstallMode,
    pub runtime_unloaded: bool,
    pub record_found: bool,
    /// `None` when files were kept
    pub files_removed: Option<bool>,
}

impl UninstallReport {
    /// Whether some best-effort step failed
    pub fn is_partial(&self) -> bool {
        self.files_removed == Some(false)
    }
}

struct OperationGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    plugin_id: String,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.plugin_id);
    }
}

/// Drives plugins through their lifecycle
pub struct LifecycleController {
    catalog: Arc<dyn PluginCatalog>,
    runtime: Arc<dyn PluginRuntime>,
    remover: Arc<dyn PluginFileRemover>,
    notifier: Arc<dyn Notifier>,
    in_flight: Mutex<HashSet<String>>,
    pending_uninstall: AsyncMutex<Option<String>>,
}

impl LifecycleController {
    pub fn new(
        catalog: Arc<dyn PluginCatalog>,
        runtime: Arc<dyn PluginRuntime>,
        remover: Arc<dyn PluginFileRemover>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            runtime,
            remover,
            notifier,
            in_flight: Mutex::new(HashSet::new()),
            pending_uninstall: AsyncMutex::new(None),
        }
    }

    /// Whether an operation is running for `plugin_id`
    pub fn is_loading(&self, plugin_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(plugin_id)
    }

    /// Mark an uploaded plugin as installed and load it into the runtime
    pub async fn install(&self, plugin_id: &str) -> Result<(), LifecycleError> {
        let outcome: Result<(), LifecycleError> = async {
            let _guard = self.begin(plugin_id)?;
            let record = self.require_record(plugin_id).await?;

            self.catalog
                .update_plugin(&record.id, PluginUpdate::installed(true))
                .await?;

            if !self.runtime.load_plugin(plugin_id).await {
                return Err(LifecycleError::RuntimeRejected {
                    plugin_id: plugin_id.to_string(),
                    operation: "load",
                });
            }
            Ok(())
        }
        .await;

        self.report(plugin_id, keys::PLUGIN_INSTALLED, outcome)
    }

    pub async fn activate(&self, plugin_id: &str) -> Result<(), LifecycleError> {
        let outcome = self.set_activation(plugin_id, true).await;
        self.report(plugin_id, keys::PLUGIN_ACTIVATED, outcome)
    }

    pub async fn deactivate(&self, plugin_id: &str) -> Result<(), LifecycleError> {
        let outcome = self.set_activation(plugin_id, false).await;
        self.report(plugin_id, keys::PLUGIN_DEACTIVATED, outcome)
    }

    /// Catalog first, then runtime. A runtime rejection leaves the catalog write in place.
    async fn set_activation(&self, plugin_id: &str, activated: bool) -> Result<(), LifecycleError> {
        let _guard = self.begin(plugin_id)?;
        let record = self.require_record(plugin_id).await?;
        if !record.is_installed {
            return Err(LifecycleError::NotInstalled(plugin_id.to_string()));
        }

        self.catalog
            .update_plugin(&record.id, PluginUpdate::activated(activated))
            .await?;

        let status = RuntimeStatus::from_activated(activated);
        if !self.runtime.toggle_plugin_status(plugin_id, status).await {
            return Err(LifecycleError::RuntimeRejected {
                plugin_id: plugin_id.to_string(),
                operation: "toggle",
            });
        }
        Ok(())
    }

    /// Open the data-retention choice for `plugin_id`
    pub async fn request_uninstall(&self, plugin_id: &str) {
        *self.pending_uninstall.lock().await = Some(plugin_id.to_string());
    }

    /// Close the pending choice without doing anything
    pub async fn cancel_uninstall(&self) -> Option<String> {
        self.pending_uninstall.lock().await.take()
    }

    pub async fn pending_uninstall(&self) -> Option<String> {
        self.pending_uninstall.lock().await.clone()
    }

    /// Uninstall the pending plugin.
    ///
    /// The runtime is unloaded first and its failure is only logged. The
    /// catalog step is fatal on failure. File removal is best-effort and a
    /// failure yields a partial report.
    pub async fn confirm_uninstall(
        &self,
        mode: UninstallMode,
    ) -> Result<UninstallReport, LifecycleError> {
        let Some(plugin_id) = self.pending_uninstall.lock().await.take() else {
            return self.report(
                "",
                keys::PLUGIN_UNINSTALLED,
                Err(LifecycleError::NoPendingUninstall),
            );
        };

        let outcome: Result<UninstallReport, LifecycleError> = async {
            let _guard = self.begin(&plugin_id)?;
            self.uninstall(&plugin_id, mode).await
        }
        .await;

        if let Ok(report) = &outcome {
            if report.is_partial() {
                warn!(
                    "Plugin {} uninstalled but its files could not be removed",
                    plugin_id
                );
                self.notifier.notify(
                    Notification::warning(keys::PLUGIN_FILES_NOT_REMOVED).with_detail(&plugin_id),
                );
                return outcome;
            }
        }

        self.report(&plugin_id, keys::PLUGIN_UNINSTALLED, outcome)
    }

    async fn uninstall(
        &self,
        plugin_id: &str,
        mode: UninstallMode,
    ) -> Result<UninstallReport, LifecycleError> {
        let runtime_unloaded = self.runtime.unload_plugin(plugin_id).await;
        if !runtime_unloaded {
            warn!("Runtime did not unload plugin {}, continuing", plugin_id);
        }

        let record = self.catalog.find_by_plugin_id(plugin_id).await?;
        let mut report = UninstallReport {
            plugin_id: plugin_id.to_string(),
            mode,
            runtime_unloaded,
            record_found: record.is_some(),
            files_removed: None,
        };
        if record.is_none() {
            warn!("Plugin {} has no catalog record, skipping catalog step", plugin_id);
        }

        match mode {
            UninstallMode::KeepData => {
                if let Some(record) = record {
                    self.catalog
                        .update_plugin(&record.id, PluginUpdate::uninstalled())
                        .await?;
                }
            }
            UninstallMode::RemovePermanently => {
                if let Some(record) = record {
                    self.catalog.delete_plugin(&record.id).await?;
                }
                let removed = self.remover.remove_plugin(plugin_id).await;
                if !removed {
                    error!("Failed to remove files for plugin {}", plugin_id);
                }
                report.files_removed = Some(removed);
            }
        }

        Ok(report)
    }

    fn begin(&self, plugin_id: &str) -> Result<OperationGuard<'_>, LifecycleError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(plugin_id.to_string()) {
            return Err(LifecycleError::Busy(plugin_id.to_string()));
        }

        Ok(OperationGuard {
            in_flight: &self.in_flight,
            plugin_id: plugin_id.to_string(),
        })
    }

    async fn require_record(&self, plugin_id: &str) -> Result<InstalledPluginRecord, LifecycleError> {
        self.catalog
            .find_by_plugin_id(plugin_id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(plugin_id.to_string()))
    }

    fn report<T>(
        &self,
        plugin_id: &str,
        success_key: &str,
        outcome: Result<T, LifecycleError>,
    ) -> Result<T, LifecycleError> {
        match &outcome {
            Ok(_) => {
                info!("{} succeeded for plugin {}", success_key, plugin_id);
                self.notifier.notify(Notification::success(success_key));
            }
            Err(e) => {
                error!("Plugin operation failed for {}: {}", plugin_id, e);
                self.notifier.notify(
                    Notification::error(keys::OPERATION_FAILED).with_detail(describe_error(e)),
                );
            }
        }
        outcome
    }
}
