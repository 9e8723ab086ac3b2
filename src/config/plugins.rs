//! Plugin directory, catalog and view configuration

use crate::view::{DEFAULT_PAGE_SIZE, DEFAULT_SEARCH_DEBOUNCE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn data_path(relative: &str) -> PathBuf {
    crate::utils::get_data_dir()
        .unwrap_or_else(|_| PathBuf::from(".plugin-store"))
        .join(relative)
}

/// Where installed plugin components live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDirectoriesConfig {
    /// Root of installed admin components, one directory per plugin
    pub admin_directory: PathBuf,

    /// Root of installed api components, one directory per plugin
    pub api_directory: PathBuf,
}

impl Default for PluginDirectoriesConfig {
    fn default() -> Self {
        Self {
            admin_directory: data_path("plugins/admin"),
            api_directory: data_path("plugins/api"),
        }
    }
}

/// Plugin catalog storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog file; the catalog is kept in memory when unset
    pub path: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: Some(data_path("catalog.yaml")),
        }
    }
}

/// Plugin list presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Plugins per page
    pub page_size: usize,

    /// Quiet period before a search term is applied
    pub search_debounce_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: DEFAULT_SEARCH_DEBOUNCE.as_millis() as u64,
        }
    }
}
