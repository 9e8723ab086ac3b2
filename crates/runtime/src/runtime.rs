//! Runtime interface and handle types

use async_trait::async_trait;
use plugin_manifest::{ManifestError, PluginManifest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Activation status of a loaded plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    Active,
    Inactive,
}

impl RuntimeStatus {
    pub fn from_activated(is_activated: bool) -> Self {
        if is_activated {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}

impl fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// A plugin currently loaded by the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimePluginHandle {
    /// Plugin identifier, equal to the manifest `pluginId`
    pub id: String,

    /// Manifest the plugin was loaded from
    pub manifest: PluginManifest,

    /// Current status
    pub status: RuntimeStatus,
}

/// Causes of a failed runtime operation. Surfaced through logs only; the
/// runtime interface reports failure as `false`.
#[derive(thiserror::Error, Debug)]
pub enum RuntimeError {
    #[error("Plugin {0} is not present in any plugin directory")]
    NotFound(String),

    #[error("Plugin {0} is not loaded")]
    NotLoaded(String),

    #[error("Plugin directory {dir} declares plugin {declared}")]
    IdMismatch { dir: String, declared: String },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The plugin host.
///
/// Operations report soft failure as `false` rather than an error; callers
/// decide whether that is fatal.
#[async_trait]
pub trait PluginRuntime: Send + Sync {
    /// Load an installed plugin; loading an already loaded plugin succeeds
    async fn load_plugin(&self, plugin_id: &str) -> bool;

    /// Unload a plugin
    async fn unload_plugin(&self, plugin_id: &str) -> bool;

    /// Set the status of a loaded plugin
    async fn toggle_plugin_status(&self, plugin_id: &str, status: RuntimeStatus) -> bool;

    /// Loaded plugins, in load order
    async fn loaded_plugins(&self) -> Vec<RuntimePluginHandle>;
}
