//! User-facing notifications

use serde::Serialize;
use tracing::{error, info, warn};

/// Namespace message keys resolve in unless overridden
pub const DEFAULT_NAMESPACE: &str = "translation";

/// Message keys emitted by the pipeline
pub mod keys {
    pub const PLUGIN_UPLOADED: &str = "pluginStore.pluginUploaded";
    pub const UPLOAD_FAILED: &str = "pluginStore.failedToUploadPlugin";
    pub const PLUGIN_INSTALLED: &str = "pluginStore.pluginInstalled";
    pub const PLUGIN_ACTIVATED: &str = "pluginStore.pluginActivated";
    pub const PLUGIN_DEACTIVATED: &str = "pluginStore.pluginDeactivated";
    pub const PLUGIN_UNINSTALLED: &str = "pluginStore.pluginUninstalled";
    pub const PLUGIN_FILES_NOT_REMOVED: &str = "pluginStore.pluginFilesNotRemoved";
    pub const OPERATION_FAILED: &str = "pluginStore.operationFailed";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

/// A message for the administrator, identified by key and namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub key: String,
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Notification {
    pub fn new(level: NotificationLevel, key: &str) -> Self {
        Self {
            level,
            key: key.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            detail: None,
        }
    }

    pub fn success(key: &str) -> Self {
        Self::new(NotificationLevel::Success, key)
    }

    pub fn warning(key: &str) -> Self {
        Self::new(NotificationLevel::Warning, key)
    }

    pub fn error(key: &str) -> Self {
        Self::new(NotificationLevel::Error, key)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }
}

/// Sink for notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier that writes to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        let detail = notification.detail.as_deref().unwrap_or("");
        match notification.level {
            NotificationLevel::Success => {
                info!("[{}:{}] {}", notification.namespace, notification.key, detail)
            }
            NotificationLevel::Warning => {
                warn!("[{}:{}] {}", notification.namespace, notification.key, detail)
            }
            NotificationLevel::Error => {
                error!("[{}:{}] {}", notification.namespace, notification.key, detail)
            }
        }
    }
}
