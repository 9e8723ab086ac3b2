//! Catalog record types

use crate::catalog::CatalogError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A plugin known to the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledPluginRecord {
    /// Opaque catalog identifier
    pub id: String,

    /// Manifest plugin identifier, unique within the catalog
    pub plugin_id: String,

    /// Whether the plugin is installed
    pub is_installed: bool,

    /// Whether the plugin is activated; implies `is_installed`
    pub is_activated: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl InstalledPluginRecord {
    /// Create a record for a freshly uploaded plugin, not yet installed
    pub fn new(plugin_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: record_id(plugin_id, &now),
            plugin_id: plugin_id.to_string(),
            is_installed: false,
            is_activated: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update, keeping `is_activated => is_installed`
    pub fn apply(&mut self, update: &PluginUpdate) -> Result<(), CatalogError> {
        let is_installed = update.is_installed.unwrap_or(self.is_installed);
        let mut is_activated = update.is_activated.unwrap_or(self.is_activated);

        if !is_installed {
            if update.is_activated == Some(true) {
                return Err(CatalogError::InvalidState(format!(
                    "cannot activate plugin {} while it is not installed",
                    self.plugin_id
                )));
            }
            is_activated = false;
        }

        self.is_installed = is_installed;
        self.is_activated = is_activated;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial update of a catalog record; `None` leaves the field unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_installed: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_activated: Option<bool>,
}

impl PluginUpdate {
    pub fn installed(is_installed: bool) -> Self {
        Self {
            is_installed: Some(is_installed),
            is_activated: None,
        }
    }

    pub fn activated(is_activated: bool) -> Self {
        Self {
            is_installed: None,
            is_activated: Some(is_activated),
        }
    }

    /// Downgrade to not installed and not activated
    pub fn uninstalled() -> Self {
        Self {
            is_installed: Some(false),
            is_activated: Some(false),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_installed.is_none() && self.is_activated.is_none()
    }
}

fn record_id(plugin_id: &str, created_at: &DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plugin_id.as_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..24].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_uploaded_but_not_installed() {
        let record = InstalledPluginRecord::new("TestPlugin");

        assert_eq!(record.plugin_id, "TestPlugin");
        assert_eq!(record.id.len(), 24);
        assert!(!record.is_installed);
        assert!(!record.is_activated);
    }

    #[test]
    fn test_uninstall_clears_activation() {
        let mut record = InstalledPluginRecord::new("TestPlugin");
        record.apply(&PluginUpdate::installed(true)).unwrap();
        record.apply(&PluginUpdate::activated(true)).unwrap();
        assert!(record.is_activated);

        record.apply(&PluginUpdate::installed(false)).unwrap();
        assert!(!record.is_installed);
        assert!(!record.is_activated);
    }

    #[test]
    fn test_activate_requires_installed() {
        let mut record = InstalledPluginRecord::new("TestPlugin");
        let err = record.apply(&PluginUpdate::activated(true)).unwrap_err();

        assert!(matches!(err, CatalogError::InvalidState(_)));
        assert!(!record.is_activated);
    }

    #[test]
    fn test_empty_update_only_touches_timestamp() {
        let mut record = InstalledPluginRecord::new("TestPlugin");
        let before = record.clone();
        record.apply(&PluginUpdate::default()).unwrap();

        assert_eq!(record.is_installed, before.is_installed);
        assert_eq!(record.is_activated, before.is_activated);
        assert!(record.updated_at >= before.updated_at);
        assert!(PluginUpdate::default().is_empty());
    }

    #[test]
    fn test_record_serializes_camel_case() {
        let record = InstalledPluginRecord::new("TestPlugin");
        let yaml = serde_yaml::to_string(&record).unwrap();

        assert!(yaml.contains("pluginId: TestPlugin"));
        assert!(yaml.contains("isInstalled: false"));
    }

    #[test]
    fn test_legacy_backup_field_is_ignored() {
        let yaml = r#"
id: 0123456789abcdef01234567
pluginId: TestPlugin
isInstalled: true
isActivated: false
backup: true
createdAt: 2024-01-01T00:00:00Z
updatedAt: 2024-01-01T00:00:00Z
"#;
        let record: InstalledPluginRecord = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(record.plugin_id, "TestPlugin");
        assert!(record.is_installed);
        assert!(!serde_yaml::to_string(&record).unwrap().contains("backup"));
    }
}
