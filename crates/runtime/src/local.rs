//! In-process runtime backed by installed plugin directories

use crate::runtime::{PluginRuntime, RuntimeError, RuntimePluginHandle, RuntimeStatus};
use async_trait::async_trait;
use plugin_manifest::{parse_manifest, PluginManifest};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const MANIFEST_FILE: &str = "manifest.json";

/// Runtime that loads plugins from `<root>/<pluginId>/manifest.json`.
///
/// Roots are searched in order; the first directory holding the plugin wins.
pub struct LocalPluginRuntime {
    roots: Vec<PathBuf>,
    loaded: RwLock<Vec<RuntimePluginHandle>>,
}

impl LocalPluginRuntime {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            loaded: RwLock::new(Vec::new()),
        }
    }

    async fn read_manifest(&self, plugin_id: &str) -> Result<PluginManifest, RuntimeError> {
        for root in &self.roots {
            let path = root.join(plugin_id).join(MANIFEST_FILE);
            if !tokio::fs::try_exists(&path).await? {
                continue;
            }

            debug!("Reading plugin manifest {:?}", path);
            let text = tokio::fs::read_to_string(&path).await?;
            let manifest = parse_manifest(&path.display().to_string(), &text)?;
            if manifest.plugin_id != plugin_id {
                return Err(RuntimeError::IdMismatch {
                    dir: plugin_id.to_string(),
                    declared: manifest.plugin_id,
                });
            }
            return Ok(manifest);
        }

        Err(RuntimeError::NotFound(plugin_id.to_string()))
    }
}

#[async_trait]
impl PluginRuntime for LocalPluginRuntime {
    async fn load_plugin(&self, plugin_id: &str) -> bool {
        if self.loaded.read().await.iter().any(|h| h.id == plugin_id) {
            debug!("Plugin {} already loaded", plugin_id);
            return true;
        }

        let manifest = match self.read_manifest(plugin_id).await {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("Failed to load plugin {}: {}", plugin_id, e);
                return false;
            }
        };

        let mut loaded = self.loaded.write().await;
        if !loaded.iter().any(|h| h.id == plugin_id) {
            loaded.push(RuntimePluginHandle {
                id: plugin_id.to_string(),
                manifest,
                status: RuntimeStatus::Inactive,
            });
            info!("Loaded plugin {}", plugin_id);
        }
        true
    }

    async fn unload_plugin(&self, plugin_id: &str) -> bool {
        let mut loaded = self.loaded.write().await;
        let before = loaded.len();
        loaded.retain(|h| h.id != plugin_id);

        if loaded.len() == before {
            warn!("{}", RuntimeError::NotLoaded(plugin_id.to_string()));
            return false;
        }

        info!("Unloaded plugin {}", plugin_id);
        true
    }

    async fn toggle_plugin_status(&self, plugin_id: &str, status: RuntimeStatus) -> bool {
        let mut loaded = self.loaded.write().await;
        match loaded.iter_mut().find(|h| h.id == plugin_id) {
            Some(handle) => {
                handle.status = status;
                info!("Plugin {} is now {}", plugin_id, status);
                true
            }
            None => {
                warn!("{}", RuntimeError::NotLoaded(plugin_id.to_string()));
                false
            }
        }
    }

    async fn loaded_plugins(&self) -> Vec<RuntimePluginHandle> {
        self.loaded.read().await.clone()
    }
}
