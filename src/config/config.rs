//! Main configuration structure and implementation

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{CatalogConfig, PluginDirectoriesConfig, ViewConfig};
use crate::utils::{ensure_directory, expand_path};

const CONFIG_VERSION: &str = "1.0";
const MAX_PAGE_SIZE: usize = 100;
const MAX_SEARCH_DEBOUNCE_MS: u64 = 10_000;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Plugin directories
    pub plugins: PluginDirectoriesConfig,

    /// Catalog storage
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Plugin list settings
    #[serde(default)]
    pub view: ViewConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            plugins: PluginDirectoriesConfig::default(),
            catalog: CatalogConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read configuration {:?}: {}", path, e))?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory(parent)?;
            }
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(anyhow!(
                "Unsupported configuration version: {}",
                self.version
            ));
        }

        if self.plugins.admin_directory.as_os_str().is_empty()
            || self.plugins.api_directory.as_os_str().is_empty()
        {
            return Err(anyhow!("Plugin directories must not be empty"));
        }

        if self.plugins.admin_directory == self.plugins.api_directory {
            return Err(anyhow!(
                "Admin and api plugin directories must differ: {:?}",
                self.plugins.admin_directory
            ));
        }

        if let Some(path) = &self.catalog.path {
            if path.as_os_str().is_empty() {
                return Err(anyhow!("Catalog path must not be empty"));
            }
        }

        if self.view.page_size == 0 || self.view.page_size > MAX_PAGE_SIZE {
            return Err(anyhow!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.view.page_size
            ));
        }

        if self.view.search_debounce_ms > MAX_SEARCH_DEBOUNCE_MS {
            return Err(anyhow!(
                "Search debounce must be at most {}ms, got {}ms",
                MAX_SEARCH_DEBOUNCE_MS,
                self.view.search_debounce_ms
            ));
        }

        Ok(())
    }

    /// Admin plugin root with `~` and environment variables expanded
    pub fn admin_dir(&self) -> Result<PathBuf> {
        expand_path(&self.plugins.admin_directory)
    }

    /// Api plugin root with `~` and environment variables expanded
    pub fn api_dir(&self) -> Result<PathBuf> {
        expand_path(&self.plugins.api_directory)
    }

    /// Expanded catalog file path, `None` for an in-memory catalog
    pub fn catalog_path(&self) -> Result<Option<PathBuf>> {
        self.catalog.path.as_deref().map(expand_path).transpose()
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.view.search_debounce_ms)
    }
}
