//! YAML-file backed catalog

use crate::catalog::{CatalogError, CatalogResult, PluginCatalog};
use crate::types::{InstalledPluginRecord, PluginUpdate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

const CATALOG_FORMAT_VERSION: &str = "1";

#[derive(Debug, Serialize, Deserialize)]
struct CatalogFile {
    version: String,
    #[serde(default)]
    plugins: Vec<InstalledPluginRecord>,
}

/// Catalog kept in memory and optionally persisted to a YAML file.
///
/// Every mutation is applied to a copy, written out, and only then committed,
/// so a failed write leaves the in-memory state untouched.
pub struct FileCatalog {
    path: Option<PathBuf>,
    records: RwLock<Vec<InstalledPluginRecord>>,
}

impl FileCatalog {
    /// Open the catalog at `path`, starting empty if the file does not exist
    pub async fn open(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let path = path.into();
        let records = if tokio::fs::try_exists(&path).await? {
            let content = tokio::fs::read_to_string(&path).await?;
            let file: CatalogFile = serde_yaml::from_str(&content)?;
            debug!(
                "Loaded {} catalog record(s) from {}",
                file.plugins.len(),
                path.display()
            );
            file.plugins
        } else {
            Vec::new()
        };

        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    /// A catalog that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: RwLock::new(Vec::new()),
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, records: &[InstalledPluginRecord]) -> CatalogResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = CatalogFile {
            version: CATALOG_FORMAT_VERSION.to_string(),
            plugins: records.to_vec(),
        };
        let content = serde_yaml::to_string(&file)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl PluginCatalog for FileCatalog {
    async fn get_all_plugins(&self) -> CatalogResult<Vec<InstalledPluginRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn create_plugin(&self, plugin_id: &str) -> CatalogResult<InstalledPluginRecord> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.plugin_id == plugin_id) {
            return Err(CatalogError::Duplicate(plugin_id.to_string()));
        }

        let record = InstalledPluginRecord::new(plugin_id);
        let mut next = records.clone();
        next.push(record.clone());
        self.persist(&next).await?;
        *records = next;

        info!("Created catalog record {} for plugin {}", record.id, plugin_id);
        Ok(record)
    }

    async fn update_plugin(
        &self,
        id: &str,
        update: PluginUpdate,
    ) -> CatalogResult<InstalledPluginRecord> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        let record = next
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        record.apply(&update)?;
        let updated = record.clone();
        self.persist(&next).await?;
        *records = next;

        debug!(
            "Updated plugin {}: installed={}, activated={}",
            updated.plugin_id, updated.is_installed, updated.is_activated
        );
        Ok(updated)
    }

    async fn delete_plugin(&self, id: &str) -> CatalogResult<()> {
        let mut records = self.records.write().await;
        let mut next = records.clone();
        let before = next.len();
        next.retain(|r| r.id != id);
        if next.len() == before {
            return Err(CatalogError::NotFound(id.to_string()));
        }

        self.persist(&next).await?;
        *records = next;

        info!("Deleted catalog record {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_list() {
        let catalog = FileCatalog::in_memory();
        catalog.create_plugin("First").await.unwrap();
        catalog.create_plugin("Second").await.unwrap();

        let all = catalog.get_all_plugins().await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.plugin_id.as_str()).collect();
        assert_eq!(ids, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_duplicate_plugin_id_is_rejected() {
        let catalog = FileCatalog::in_memory();
        catalog.create_plugin("TestPlugin").await.unwrap();

        let err = catalog.create_plugin("TestPlugin").await.unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate(id) if id == "TestPlugin"));
        assert_eq!(catalog.get_all_plugins().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_find() {
        let catalog = FileCatalog::in_memory();
        let record = catalog.create_plugin("TestPlugin").await.unwrap();

        catalog
            .update_plugin(&record.id, PluginUpdate::installed(true))
            .await
            .unwrap();
        let updated = catalog
            .update_plugin(&record.id, PluginUpdate::activated(true))
            .await
            .unwrap();
        assert!(updated.is_installed && updated.is_activated);

        let found = catalog.find_by_plugin_id("TestPlugin").await.unwrap();
        assert_eq!(found, Some(updated));
        assert!(catalog.find_by_plugin_id("Other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_record_unchanged() {
        let catalog = FileCatalog::in_memory();
        let record = catalog.create_plugin("TestPlugin").await.unwrap();

        let err = catalog
            .update_plugin(&record.id, PluginUpdate::activated(true))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidState(_)));

        let stored = catalog.find_by_plugin_id("TestPlugin").await.unwrap().unwrap();
        assert!(!stored.is_activated);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let catalog = FileCatalog::in_memory();

        assert!(matches!(
            catalog.update_plugin("missing", PluginUpdate::default()).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.delete_plugin("missing").await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_records_persist_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("catalog.yaml");

        let catalog = FileCatalog::open(&path).await.unwrap();
        let keep = catalog.create_plugin("Keep").await.unwrap();
        let drop = catalog.create_plugin("Drop").await.unwrap();
        catalog
            .update_plugin(&keep.id, PluginUpdate::installed(true))
            .await
            .unwrap();
        catalog.delete_plugin(&drop.id).await.unwrap();
        assert!(path.exists());

        let reopened = FileCatalog::open(&path).await.unwrap();
        let all = reopened.get_all_plugins().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].plugin_id, "Keep");
        assert!(all[0].is_installed);
        assert_eq!(reopened.path(), Some(path.as_path()));
    }
}
