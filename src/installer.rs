//! Plugin installation: writing component trees and registering the catalog record

use crate::archive::{ArchiveStructure, Component, SelectedArchive, MANIFEST_FILE};
use crate::utils::{describe_error, is_safe_relative_path};
use async_trait::async_trait;
use plugin_catalog::{CatalogError, InstalledPluginRecord, PluginCatalog, PluginUpdate};
use plugin_manifest::{parse_manifest, validate_plugin_id, ManifestError, PluginManifest};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Prefix of the scratch directories used while replacing a component tree
const STAGING_PREFIX: &str = ".staging-";

/// Errors from the plugin file service
#[derive(thiserror::Error, Debug)]
pub enum FileServiceError {
    #[error(transparent)]
    InvalidPluginId(#[from] ManifestError),

    #[error("Unsafe file path in plugin archive: {0}")]
    UnsafePath(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Removes a plugin's installed files
#[async_trait]
pub trait PluginFileRemover: Send + Sync {
    /// Remove every installed component of `plugin_id`; `false` on failure
    async fn remove_plugin(&self, plugin_id: &str) -> bool;
}

/// Plugin directories on disk: `<admin_dir>/<pluginId>` and `<api_dir>/<pluginId>`
#[derive(Debug, Clone)]
pub struct PluginFileService {
    admin_dir: PathBuf,
    api_dir: PathBuf,
}

impl PluginFileService {
    pub fn new(admin_dir: PathBuf, api_dir: PathBuf) -> Self {
        Self { admin_dir, api_dir }
    }

    /// Root directory holding all plugins of a component
    pub fn root(&self, component: Component) -> &Path {
        match component {
            Component::Admin => &self.admin_dir,
            Component::Api => &self.api_dir,
        }
    }

    /// Directory of one plugin's component
    pub fn plugin_dir(&self, component: Component, plugin_id: &str) -> PathBuf {
        self.root(component).join(plugin_id)
    }

    /// Write a component tree, replacing any previous install. Returns the number of files written.
    pub async fn write_component(
        &self,
        component: Component,
        plugin_id: &str,
        files: &BTreeMap<String, Vec<u8>>,
    ) -> Result<usize, FileServiceError> {
        validate_plugin_id(plugin_id)?;
        if let Some(unsafe_path) = files.keys().find(|p| !is_safe_relative_path(p)) {
            return Err(FileServiceError::UnsafePath(unsafe_path.clone()));
        }

        let root = self.root(component);
        tokio::fs::create_dir_all(root).await?;
        let target = self.plugin_dir(component, plugin_id);

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)?;
        let staged = staging.path().join(plugin_id);
        tokio::fs::create_dir_all(&staged).await?;
        for (relative, content) in files {
            let path = staged.join(relative);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
        }

        // The previous tree stays in place until the new one is complete
        let retired = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(root)?;
        let previous = retired.path().join(plugin_id);
        let replacing = tokio::fs::try_exists(&target).await?;
        if replacing {
            debug!("Replacing existing {} files for {}", component, plugin_id);
            tokio::fs::rename(&target, &previous).await?;
        }

        if let Err(e) = tokio::fs::rename(&staged, &target).await {
            if replacing {
                if let Err(restore) = tokio::fs::rename(&previous, &target).await {
                    error!(
                        "Could not restore previous {} files for {}: {}",
                        component, plugin_id, restore
                    );
                }
            }
            return Err(e.into());
        }

        info!(
            "Wrote {} {} file(s) to {:?}",
            files.len(),
            component,
            target
        );
        Ok(files.len())
    }

    /// Manifests of plugins installed for a component, sorted by directory name.
    ///
    /// Directories without a parseable manifest are skipped.
    pub fn list_installed(&self, component: Component) -> Vec<PluginManifest> {
        let root = self.root(component);
        if !root.exists() {
            return Vec::new();
        }

        WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .filter(|e| !e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .filter_map(|entry| {
                let manifest_path = entry.path().join(MANIFEST_FILE);
                let text = std::fs::read_to_string(&manifest_path).ok()?;
                match parse_manifest(&manifest_path.display().to_string(), &text) {
                    Ok(manifest) => Some(manifest),
                    Err(e) => {
                        warn!("Skipping plugin directory {:?}: {}", entry.path(), e);
                        None
                    }
                }
            })
            .collect()
    }

    /// Remove one component directory. Returns whether anything was removed.
    pub async fn remove_component(
        &self,
        component: Component,
        plugin_id: &str,
    ) -> Result<bool, FileServiceError> {
        validate_plugin_id(plugin_id)?;

        let target = self.plugin_dir(component, plugin_id);
        if !tokio::fs::try_exists(&target).await? {
            return Ok(false);
        }

        tokio::fs::remove_dir_all(&target).await?;
        info!("Removed {} files for {}", component, plugin_id);
        Ok(true)
    }
}

#[async_trait]
impl PluginFileRemover for PluginFileService {
    async fn remove_plugin(&self, plugin_id: &str) -> bool {
        let mut ok = true;
        for component in [Component::Admin, Component::Api] {
            if let Err(e) = self.remove_component(component, plugin_id).await {
                error!("Failed to remove {} files for {}: {}", component, plugin_id, e);
                ok = false;
            }
        }
        ok
    }
}

/// Outcome of an install attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallResult {
    pub success: bool,
    pub plugin_id: String,
    pub manifest: Option<PluginManifest>,
    /// Component labels in detection order
    pub installed_components: Vec<String>,
    pub files_written: usize,
    pub archive_sha256: String,
    pub error: Option<String>,
}

impl InstallResult {
    fn failed(plugin_id: String, archive_sha256: String, error: String) -> Self {
        Self {
            success: false,
            plugin_id,
            manifest: None,
            installed_components: Vec::new(),
            files_written: 0,
            archive_sha256,
            error: Some(error),
        }
    }
}

/// Installs validated archives
pub struct PluginInstaller {
    files: Arc<PluginFileService>,
    catalog: Arc<dyn PluginCatalog>,
}

impl PluginInstaller {
    pub fn new(files: Arc<PluginFileService>, catalog: Arc<dyn PluginCatalog>) -> Self {
        Self { files, catalog }
    }

    /// Install a validated archive.
    ///
    /// Returns `None` without side effects when either input is missing.
    /// Failures are reported in the result, never as an error.
    pub async fn install(
        &self,
        selected: Option<&SelectedArchive>,
        structure: Option<&ArchiveStructure>,
    ) -> Option<InstallResult> {
        let (selected, structure) = match (selected, structure) {
            (Some(selected), Some(structure)) => (selected, structure),
            _ => {
                debug!("Install requested without a validated archive");
                return None;
            }
        };

        let archive_sha256 = selected.sha256();
        let Some(manifest) = structure.manifest() else {
            return Some(InstallResult::failed(
                String::new(),
                archive_sha256,
                "Invalid plugin structure: no manifest.json found".to_string(),
            ));
        };

        let mut result = InstallResult {
            success: false,
            plugin_id: manifest.plugin_id.clone(),
            manifest: Some(manifest.clone()),
            installed_components: Vec::new(),
            files_written: 0,
            archive_sha256,
            error: None,
        };

        info!(
            "Installing plugin {} from {}",
            result.plugin_id, selected.file_name
        );

        match self.install_components(structure, &mut result).await {
            Ok(record) => {
                info!(
                    "Installed plugin {} ({}) as catalog record {}",
                    result.plugin_id,
                    result.installed_components.join(", "),
                    record.id
                );
                result.success = true;
            }
            Err(message) => {
                error!("Plugin installation failed: {}", message);
                result.error = Some(message);
            }
        }

        Some(result)
    }

    async fn install_components(
        &self,
        structure: &ArchiveStructure,
        result: &mut InstallResult,
    ) -> Result<InstalledPluginRecord, String> {
        let plugin_id = result.plugin_id.clone();
        validate_plugin_id(&plugin_id).map_err(|e| describe_error(&e))?;
        check_main_file(structure)?;

        for component in structure.components() {
            let written = self
                .files
                .write_component(component, &plugin_id, structure.files(component))
                .await
                .map_err(|e| {
                    format!(
                        "Failed to install {} plugin: {}",
                        component,
                        describe_error(&e)
                    )
                })?;
            result.files_written += written;
            result.installed_components.push(component.label().to_string());
        }

        self.register(&plugin_id)
            .await
            .map_err(|e| format!("Failed to create plugin in database: {}", describe_error(&e)))
    }

    /// Create the catalog record, or touch the existing one on re-upload
    async fn register(&self, plugin_id: &str) -> Result<InstalledPluginRecord, CatalogError> {
        match self.catalog.find_by_plugin_id(plugin_id).await? {
            Some(existing) => {
                debug!("Plugin {} already in catalog, refreshing record", plugin_id);
                self.catalog
                    .update_plugin(&existing.id, PluginUpdate::default())
                    .await
            }
            None => self.catalog.create_plugin(plugin_id).await,
        }
    }
}

/// The admin manifest's `main` entry must be part of the admin tree
fn check_main_file(structure: &ArchiveStructure) -> Result<(), String> {
    let Some(manifest) = structure.admin_manifest.as_ref() else {
        return Ok(());
    };

    let main = manifest.main.trim_start_matches("./");
    if structure.files(Component::Admin).contains_key(main) {
        Ok(())
    } else {
        Err(format!(
            "Failed to install {} plugin: Main file not found: {}",
            Component::Admin,
            manifest.main
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::inspect_archive;
    use crate::testing::{ArchiveBuilder, FailingCatalog};
    use plugin_catalog::FileCatalog;
    use tempfile::TempDir;

    fn file_service(temp_dir: &TempDir) -> Arc<PluginFileService> {
        Arc::new(PluginFileService::new(
            temp_dir.path().join("admin"),
            temp_dir.path().join("api"),
        ))
    }

    fn selected(bytes: &[u8]) -> SelectedArchive {
        SelectedArchive::new("plugin.zip", bytes.to_vec())
    }

    #[tokio::test]
    async fn test_install_writes_both_components() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(FileCatalog::in_memory());
        let installer = PluginInstaller::new(file_service(&temp_dir), catalog.clone());

        let bytes = ArchiveBuilder::new()
            .admin_plugin("TestPlugin")
            .file("admin/components/Dashboard.tsx", "<div/>")
            .api_manifest("TestPlugin")
            .file("api/index.ts", "export {}")
            .build()
            .unwrap();
        let structure = inspect_archive(&bytes).unwrap();

        let result = installer
            .install(Some(&selected(&bytes)), Some(&structure))
            .await
            .unwrap();

        assert!(result.success, "{:?}", result.error);
        assert_eq!(
            result.installed_components,
            vec!["Admin Dashboard Components", "API Backend Components"]
        );
        assert_eq!(result.files_written, 5);
        assert!(temp_dir
            .path()
            .join("admin/TestPlugin/components/Dashboard.tsx")
            .exists());
        assert!(temp_dir.path().join("api/TestPlugin/index.ts").exists());

        let record = catalog.find_by_plugin_id("TestPlugin").await.unwrap().unwrap();
        assert!(!record.is_installed);
        assert!(!record.is_activated);
    }

    #[tokio::test]
    async fn test_missing_inputs_are_a_no_op() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(FileCatalog::in_memory());
        let installer = PluginInstaller::new(file_service(&temp_dir), catalog.clone());
        let bytes = ArchiveBuilder::new()
            .admin_manifest("TestPlugin")
            .build()
            .unwrap();
        let structure = inspect_archive(&bytes).unwrap();

        assert!(installer.install(None, Some(&structure)).await.is_none());
        assert!(installer.install(Some(&selected(&bytes)), None).await.is_none());
        assert!(catalog.get_all_plugins().await.unwrap().is_empty());
        assert!(!temp_dir.path().join("admin").exists());
    }

    #[tokio::test]
    async fn test_reupload_touches_existing_record() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(FileCatalog::in_memory());
        let installer = PluginInstaller::new(file_service(&temp_dir), catalog.clone());
        let bytes = ArchiveBuilder::new()
            .admin_plugin("TestPlugin")
            .build()
            .unwrap();
        let structure = inspect_archive(&bytes).unwrap();

        let first = installer
            .install(Some(&selected(&bytes)), Some(&structure))
            .await
            .unwrap();
        let second = installer
            .install(Some(&selected(&bytes)), Some(&structure))
            .await
            .unwrap();

        assert!(first.success && second.success);
        assert_eq!(catalog.get_all_plugins().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_catalog_failure_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(FailingCatalog::new("service offline"));
        catalog.set_failing(true);
        let installer = PluginInstaller::new(file_service(&temp_dir), catalog);
        let bytes = ArchiveBuilder::new()
            .admin_plugin("TestPlugin")
            .build()
            .unwrap();
        let structure = inspect_archive(&bytes).unwrap();

        let result = installer
            .install(Some(&selected(&bytes)), Some(&structure))
            .await
            .unwrap();

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.starts_with("Failed to create plugin in database"));
        assert!(error.contains("service offline"));
    }

    #[tokio::test]
    async fn test_invalid_plugin_id_is_rejected_before_writing() {
        let temp_dir = TempDir::new().unwrap();
        let installer =
            PluginInstaller::new(file_service(&temp_dir), Arc::new(FileCatalog::in_memory()));
        let bytes = ArchiveBuilder::new()
            .admin_manifest("bad-plugin-id")
            .build()
            .unwrap();
        let structure = inspect_archive(&bytes).unwrap();

        let result = installer
            .install(Some(&selected(&bytes)), Some(&structure))
            .await
            .unwrap();

        assert!(!result.success);
        assert!(result.error.unwrap().contains("bad-plugin-id"));
        assert!(!temp_dir.path().join("admin").exists());
    }

    #[tokio::test]
    async fn test_unsafe_paths_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let files = file_service(&temp_dir);
        let mut tree = BTreeMap::new();
        tree.insert("../escape.js".to_string(), b"x".to_vec());

        let err = files
            .write_component(Component::Admin, "TestPlugin", &tree)
            .await
            .unwrap_err();

        assert!(matches!(err, FileServiceError::UnsafePath(_)));
        assert!(!temp_dir.path().join("admin/escape.js").exists());
    }

    #[tokio::test]
    async fn test_list_and_remove_plugin_files() {
        let temp_dir = TempDir::new().unwrap();
        let files = file_service(&temp_dir);
        let bytes = ArchiveBuilder::new()
            .admin_manifest("TestPlugin")
            .api_manifest("TestPlugin")
            .build()
            .unwrap();
        let structure = inspect_archive(&bytes).unwrap();
        for component in structure.components() {
            files
                .write_component(component, "TestPlugin", structure.files(component))
                .await
                .unwrap();
        }
        std::fs::create_dir_all(temp_dir.path().join("admin/Broken")).unwrap();

        let installed = files.list_installed(Component::Admin);
        assert_eq!(installed.len(), 1);
        assert_eq!(installed[0].plugin_id, "TestPlugin");

        assert!(files.remove_plugin("TestPlugin").await);
        assert!(!files.plugin_dir(Component::Admin, "TestPlugin").exists());
        assert!(!files.plugin_dir(Component::Api, "TestPlugin").exists());
        assert!(files.list_installed(Component::Api).is_empty());

        assert!(!files.remove_plugin("../outside").await);
    }

    #[tokio::test]
    async fn test_missing_main_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = Arc::new(FileCatalog::in_memory());
        let installer = PluginInstaller::new(file_service(&temp_dir), catalog.clone());
        let bytes = ArchiveBuilder::new()
            .admin_manifest("TestPlugin")
            .file("admin/components/Widget.tsx", "<div/>")
            .build()
            .unwrap();
        let structure = inspect_archive(&bytes).unwrap();

        let result = installer
            .install(Some(&selected(&bytes)), Some(&structure))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Failed to install admin plugin: Main file not found: index.js")
        );
        assert!(!temp_dir.path().join("admin/TestPlugin").exists());
        assert!(catalog.get_all_plugins().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_rewrite_keeps_previous_install() {
        let temp_dir = TempDir::new().unwrap();
        let files = file_service(&temp_dir);
        let mut first = BTreeMap::new();
        first.insert("manifest.json".to_string(), b"v1".to_vec());
        first.insert("index.js".to_string(), b"v1".to_vec());
        files
            .write_component(Component::Admin, "TestPlugin", &first)
            .await
            .unwrap();

        // "lib" is written as a file, so "lib/util.js" cannot be created
        let mut broken = BTreeMap::new();
        broken.insert("index.js".to_string(), b"v2".to_vec());
        broken.insert("lib".to_string(), b"v2".to_vec());
        broken.insert("lib/util.js".to_string(), b"v2".to_vec());
        let err = files
            .write_component(Component::Admin, "TestPlugin", &broken)
            .await
            .unwrap_err();
        assert!(matches!(err, FileServiceError::Io(_)));

        let plugin_dir = files.plugin_dir(Component::Admin, "TestPlugin");
        assert_eq!(std::fs::read(plugin_dir.join("index.js")).unwrap(), b"v1");
        assert!(plugin_dir.join("manifest.json").exists());
        assert!(!plugin_dir.join("lib").exists());

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path().join("admin"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("TestPlugin")]);
    }

    #[tokio::test]
    async fn test_rewrite_replaces_previous_tree() {
        let temp_dir = TempDir::new().unwrap();
        let files = file_service(&temp_dir);
        let mut first = BTreeMap::new();
        first.insert("index.js".to_string(), b"v1".to_vec());
        first.insert("old.js".to_string(), b"v1".to_vec());
        files
            .write_component(Component::Api, "TestPlugin", &first)
            .await
            .unwrap();

        let mut second = BTreeMap::new();
        second.insert("index.js".to_string(), b"v2".to_vec());
        assert_eq!(
            files
                .write_component(Component::Api, "TestPlugin", &second)
                .await
                .unwrap(),
            1
        );

        let plugin_dir = files.plugin_dir(Component::Api, "TestPlugin");
        assert_eq!(std::fs::read(plugin_dir.join("index.js")).unwrap(), b"v2");
        assert!(!plugin_dir.join("old.js").exists());
        assert_eq!(std::fs::read_dir(temp_dir.path().join("api")).unwrap().count(), 1);
    }
}
