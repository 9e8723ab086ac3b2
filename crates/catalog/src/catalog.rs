//! Catalog service interface

use crate::types::{InstalledPluginRecord, PluginUpdate};
use async_trait::async_trait;

/// Errors returned by catalog operations
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Plugin already exists in catalog: {0}")]
    Duplicate(String),

    #[error("Plugin record not found: {0}")]
    NotFound(String),

    #[error("Invalid plugin state: {0}")]
    InvalidState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_yaml::Error),

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// The remote registry of plugins and their install/activation flags.
///
/// Writes are last-write-wins; there is no version field to detect concurrent
/// updates of the same record.
#[async_trait]
pub trait PluginCatalog: Send + Sync {
    /// All records, in creation order
    async fn get_all_plugins(&self) -> CatalogResult<Vec<InstalledPluginRecord>>;

    /// Create a record for `plugin_id`; fails with `Duplicate` if one exists
    async fn create_plugin(&self, plugin_id: &str) -> CatalogResult<InstalledPluginRecord>;

    /// Apply a partial update to the record with catalog id `id`
    async fn update_plugin(
        &self,
        id: &str,
        update: PluginUpdate,
    ) -> CatalogResult<InstalledPluginRecord>;

    /// Delete the record with catalog id `id`
    async fn delete_plugin(&self, id: &str) -> CatalogResult<()>;

    /// Look a record up by manifest plugin id
    async fn find_by_plugin_id(
        &self,
        plugin_id: &str,
    ) -> CatalogResult<Option<InstalledPluginRecord>> {
        let records = self.get_all_plugins().await?;
        Ok(records.into_iter().find(|r| r.plugin_id == plugin_id))
    }
}
