//! Test doubles and fixtures for exercising the pipeline without real services

use crate::config::Config;
use crate::installer::PluginFileRemover;
use crate::notify::{Notification, Notifier};
use crate::PluginStore;
use anyhow::Result;
use async_trait::async_trait;
use plugin_catalog::{
    CatalogError, CatalogResult, FileCatalog, InstalledPluginRecord, PluginCatalog, PluginUpdate,
};
use plugin_manifest::PluginManifest;
use plugin_runtime::{PluginRuntime, RuntimePluginHandle, RuntimeStatus};
use serde_json::json;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::TempDir;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Manifest JSON text with every required field set
pub fn manifest_json(plugin_id: &str) -> String {
    json!({
        "name": format!("{plugin_id} Plugin"),
        "pluginId": plugin_id,
        "version": "1.0.0",
        "description": format!("Description of {plugin_id}"),
        "author": "Test Author",
        "main": "index.js",
    })
    .to_string()
}

/// The manifest `manifest_json` describes
pub fn test_manifest(plugin_id: &str) -> PluginManifest {
    PluginManifest {
        name: format!("{plugin_id} Plugin"),
        plugin_id: plugin_id.to_string(),
        version: "1.0.0".to_string(),
        description: format!("Description of {plugin_id}"),
        author: "Test Author".to_string(),
        main: "index.js".to_string(),
        icon: None,
        homepage: None,
        license: None,
        tags: Vec::new(),
        extension_points: None,
    }
}

/// Builds plugin archives in memory
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(self, name: &str, content: &str) -> Self {
        self.file_bytes(name, content.as_bytes().to_vec())
    }

    pub fn file_bytes(mut self, name: &str, content: Vec<u8>) -> Self {
        self.entries.push((name.to_string(), Some(content)));
        self
    }

    pub fn dir(mut self, name: &str) -> Self {
        self.entries.push((name.to_string(), None));
        self
    }

    pub fn admin_manifest(self, plugin_id: &str) -> Self {
        self.file("admin/manifest.json", &manifest_json(plugin_id))
    }

    /// Admin manifest plus the `index.js` entry it names
    pub fn admin_plugin(self, plugin_id: &str) -> Self {
        self.admin_manifest(plugin_id)
            .file("admin/index.js", "export default {};")
    }

    pub fn api_manifest(self, plugin_id: &str) -> Self {
        self.file("api/manifest.json", &manifest_json(plugin_id))
    }

    /// Archive bytes, entries in insertion order
    pub fn build(self) -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();

        for (name, content) in self.entries {
            match content {
                Some(content) => {
                    writer.start_file(name, options)?;
                    writer.write_all(&content)?;
                }
                None => writer.add_directory(name, options)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Write the archive to `path`
    pub fn write_to(self, path: &Path) -> Result<PathBuf> {
        std::fs::write(path, self.build()?)?;
        Ok(path.to_path_buf())
    }
}

/// Notifier that keeps everything it is sent
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn keys(&self) -> Vec<String> {
        lock(&self.notifications)
            .iter()
            .map(|n| n.key.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}

/// A call made to [`MockRuntime`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCall {
    Load(String),
    Unload(String),
    Toggle(String, RuntimeStatus),
}

/// Runtime that records calls and optionally rejects everything
#[derive(Debug)]
pub struct MockRuntime {
    accept: bool,
    handles: Mutex<Vec<RuntimePluginHandle>>,
    calls: Mutex<Vec<RuntimeCall>>,
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            accept: true,
            handles: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A runtime whose operations all report failure
    pub fn rejecting() -> Self {
        Self {
            accept: false,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        lock(&self.calls).clone()
    }

    pub fn status_of(&self, plugin_id: &str) -> Option<RuntimeStatus> {
        lock(&self.handles)
            .iter()
            .find(|h| h.id == plugin_id)
            .map(|h| h.status)
    }
}

#[async_trait]
impl PluginRuntime for MockRuntime {
    async fn load_plugin(&self, plugin_id: &str) -> bool {
        lock(&self.calls).push(RuntimeCall::Load(plugin_id.to_string()));
        if !self.accept {
            return false;
        }

        let mut handles = lock(&self.handles);
        if !handles.iter().any(|h| h.id == plugin_id) {
            handles.push(RuntimePluginHandle {
                id: plugin_id.to_string(),
                manifest: test_manifest(plugin_id),
                status: RuntimeStatus::Inactive,
            });
        }
        true
    }

    async fn unload_plugin(&self, plugin_id: &str) -> bool {
        lock(&self.calls).push(RuntimeCall::Unload(plugin_id.to_string()));
        if !self.accept {
            return false;
        }

        let mut handles = lock(&self.handles);
        let before = handles.len();
        handles.retain(|h| h.id != plugin_id);
        handles.len() < before
    }

    async fn toggle_plugin_status(&self, plugin_id: &str, status: RuntimeStatus) -> bool {
        lock(&self.calls).push(RuntimeCall::Toggle(plugin_id.to_string(), status));
        if !self.accept {
            return false;
        }

        if let Some(handle) = lock(&self.handles).iter_mut().find(|h| h.id == plugin_id) {
            handle.status = status;
        }
        true
    }

    async fn loaded_plugins(&self) -> Vec<RuntimePluginHandle> {
        lock(&self.handles).clone()
    }
}

/// File remover that records calls and returns a fixed result
#[derive(Debug)]
pub struct MockRemover {
    result: bool,
    calls: Mutex<Vec<String>>,
}

impl MockRemover {
    pub fn new(result: bool) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl PluginFileRemover for MockRemover {
    async fn remove_plugin(&self, plugin_id: &str) -> bool {
        lock(&self.calls).push(plugin_id.to_string());
        self.result
    }
}

/// In-memory catalog whose writes can be switched to fail
pub struct FailingCatalog {
    inner: FileCatalog,
    failing: AtomicBool,
    message: String,
}

impl FailingCatalog {
    pub fn new(message: &str) -> Self {
        Self {
            inner: FileCatalog::in_memory(),
            failing: AtomicBool::new(false),
            message: message.to_string(),
        }
    }

    /// The wrapped catalog, for seeding records
    pub fn inner(&self) -> &FileCatalog {
        &self.inner
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> CatalogResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(CatalogError::Unavailable(self.message.clone()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginCatalog for FailingCatalog {
    async fn get_all_plugins(&self) -> CatalogResult<Vec<InstalledPluginRecord>> {
        self.inner.get_all_plugins().await
    }

    async fn create_plugin(&self, plugin_id: &str) -> CatalogResult<InstalledPluginRecord> {
        self.check()?;
        self.inner.create_plugin(plugin_id).await
    }

    async fn update_plugin(
        &self,
        id: &str,
        update: PluginUpdate,
    ) -> CatalogResult<InstalledPluginRecord> {
        self.check()?;
        self.inner.update_plugin(id, update).await
    }

    async fn delete_plugin(&self, id: &str) -> CatalogResult<()> {
        self.check()?;
        self.inner.delete_plugin(id).await
    }
}

/// Temporary plugin directories, catalog file and config
pub struct TestEnvironment {
    temp_dir: TempDir,
    config: Config,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let mut config = Config::default();
        config.plugins.admin_directory = temp_dir.path().join("plugins").join("admin");
        config.plugins.api_directory = temp_dir.path().join("plugins").join("api");
        config.catalog.path = Some(temp_dir.path().join("catalog.yaml"));

        Ok(Self { temp_dir, config })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Write the config to `plugin-store.yaml` in the environment
    pub fn write_config(&self) -> Result<PathBuf> {
        let path = self.temp_dir.path().join("plugin-store.yaml");
        self.config.save_to_file(&path)?;
        Ok(path)
    }

    /// A store over the environment with a recording notifier
    pub async fn store(&self) -> Result<(PluginStore, Arc<RecordingNotifier>)> {
        let notifier = Arc::new(RecordingNotifier::new());
        let store = PluginStore::with_notifier(self.config.clone(), notifier.clone()).await?;
        Ok((store, notifier))
    }
}
