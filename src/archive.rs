//! Plugin archive inspection
//!
//! A plugin archive is a ZIP file with an `admin/` component tree, an `api/`
//! component tree, or both. Each tree carries a `manifest.json` at its root.

use crate::utils::calculate_bytes_hash;
use plugin_manifest::{parse_manifest, ManifestError, PluginManifest};
use std::collections::BTreeMap;
use std::fmt;
use std::io::{Cursor, Read};
use tracing::{debug, info};

/// Manifest file expected at the root of each component tree
pub const MANIFEST_FILE: &str = "manifest.json";

const SYSTEM_ENTRIES: [&str; 3] = ["__MACOSX", "Thumbs.db", "desktop.ini"];

/// Upper bound on the buffer reserved up front for one entry
const MAX_ENTRY_PREALLOC: u64 = 1024 * 1024;

/// A component tree inside a plugin archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Component {
    Admin,
    Api,
}

impl Component {
    /// Directory name inside the archive and under the plugin roots
    pub fn dir_name(self) -> &'static str {
        match self {
            Component::Admin => "admin",
            Component::Api => "api",
        }
    }

    /// Display label used in install reports
    pub fn label(self) -> &'static str {
        match self {
            Component::Admin => "Admin Dashboard Components",
            Component::Api => "API Backend Components",
        }
    }

    fn manifest_label(self) -> String {
        format!("{} {}", self.dir_name(), MANIFEST_FILE)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Errors produced while inspecting an archive
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to read plugin archive: {0}")]
    Corrupt(String),

    #[error("Invalid plugin structure: archive must contain either an admin or api component tree")]
    Structure,

    #[error("Invalid plugin structure: {component} component has no manifest.json")]
    MissingManifest { component: Component },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Invalid api manifest.json: pluginId '{api}' does not match admin pluginId '{admin}'")]
    PluginIdMismatch { admin: String, api: String },
}

/// An archive picked by the administrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SelectedArchive {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Hex SHA-256 digest of the archive bytes
    pub fn sha256(&self) -> String {
        calculate_bytes_hash(&self.bytes)
    }
}

/// Classified contents of a valid plugin archive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveStructure {
    pub has_admin_component: bool,
    pub has_api_component: bool,
    pub admin_manifest: Option<PluginManifest>,
    pub api_manifest: Option<PluginManifest>,
    /// Admin files keyed by path relative to `admin/`
    pub admin_files: BTreeMap<String, Vec<u8>>,
    /// Api files keyed by path relative to `api/`
    pub api_files: BTreeMap<String, Vec<u8>>,
    /// Api file paths in archive order
    pub api_file_list: Vec<String>,
}

impl ArchiveStructure {
    /// The admin manifest if present, otherwise the api manifest
    pub fn manifest(&self) -> Option<&PluginManifest> {
        self.admin_manifest.as_ref().or(self.api_manifest.as_ref())
    }

    pub fn plugin_id(&self) -> Option<&str> {
        self.manifest().map(|m| m.plugin_id.as_str())
    }

    /// Present components in detection order
    pub fn components(&self) -> Vec<Component> {
        let mut components = Vec::with_capacity(2);
        if self.has_admin_component {
            components.push(Component::Admin);
        }
        if self.has_api_component {
            components.push(Component::Api);
        }
        components
    }

    pub fn files(&self, component: Component) -> &BTreeMap<String, Vec<u8>> {
        match component {
            Component::Admin => &self.admin_files,
            Component::Api => &self.api_files,
        }
    }

    pub fn file_count(&self) -> usize {
        self.admin_files.len() + self.api_files.len()
    }
}

/// Validates archives off the async executor
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveValidator;

impl ArchiveValidator {
    pub fn new() -> Self {
        Self
    }

    /// Inspect `bytes` on the blocking pool
    pub async fn validate(&self, bytes: Vec<u8>) -> Result<ArchiveStructure, ArchiveError> {
        tokio::task::spawn_blocking(move || inspect_archive(&bytes))
            .await
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?
    }
}

/// Inspect and classify a plugin archive.
///
/// Returns the full structure or an error; never a partial result.
pub fn inspect_archive(bytes: &[u8]) -> Result<ArchiveStructure, ArchiveError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
    let mut structure = ArchiveStructure::default();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

        let name = file.name().replace('\\', "/");
        let Some((component, relative)) = classify_entry(&name) else {
            debug!("Ignoring archive entry outside component trees: {}", name);
            continue;
        };
        if is_hidden_entry(relative) {
            debug!("Skipping hidden archive entry: {}", name);
            continue;
        }

        match component {
            Component::Admin => structure.has_admin_component = true,
            Component::Api => structure.has_api_component = true,
        }

        if file.is_dir() || relative.is_empty() || relative.ends_with('/') {
            continue;
        }

        // Declared sizes come from the archive and are not trusted
        let mut content = Vec::with_capacity(entry_capacity(file.size()));
        file.read_to_end(&mut content)
            .map_err(|e| ArchiveError::Corrupt(format!("{name}: {e}")))?;

        let relative = relative.to_string();
        match component {
            Component::Admin => {
                structure.admin_files.insert(relative, content);
            }
            Component::Api => {
                structure.api_file_list.push(relative.clone());
                structure.api_files.insert(relative, content);
            }
        }
    }

    if !structure.has_admin_component && !structure.has_api_component {
        return Err(ArchiveError::Structure);
    }

    if structure.has_admin_component {
        structure.admin_manifest = Some(component_manifest(&structure, Component::Admin)?);
    }
    if structure.has_api_component {
        structure.api_manifest = Some(component_manifest(&structure, Component::Api)?);
    }

    if let (Some(admin), Some(api)) = (&structure.admin_manifest, &structure.api_manifest) {
        if admin.plugin_id != api.plugin_id {
            return Err(ArchiveError::PluginIdMismatch {
                admin: admin.plugin_id.clone(),
                api: api.plugin_id.clone(),
            });
        }
    }

    info!(
        "Validated plugin archive: plugin={}, components={:?}, files={}",
        structure.plugin_id().unwrap_or_default(),
        structure.components(),
        structure.file_count()
    );

    Ok(structure)
}

fn entry_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_ENTRY_PREALLOC) as usize
}

fn classify_entry(name: &str) -> Option<(Component, &str)> {
    for component in [Component::Admin, Component::Api] {
        if let Some(rest) = name
            .strip_prefix(component.dir_name())
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return Some((component, rest));
        }
    }
    None
}

/// Whether any path component is a dotfile or an OS metadata entry
fn is_hidden_entry(relative: &str) -> bool {
    relative
        .split('/')
        .any(|part| part.starts_with('.') || SYSTEM_ENTRIES.contains(&part))
}

fn component_manifest(
    structure: &ArchiveStructure,
    component: Component,
) -> Result<PluginManifest, ArchiveError> {
    let bytes = structure
        .files(component)
        .get(MANIFEST_FILE)
        .ok_or(ArchiveError::MissingManifest { component })?;

    let label = component.manifest_label();
    let text = std::str::from_utf8(bytes).map_err(|e| ManifestError::Parse {
        file: label.clone(),
        detail: e.to_string(),
    })?;

    Ok(parse_manifest(&label, text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{manifest_json, ArchiveBuilder};

    #[test]
    fn test_admin_and_api_archive() {
        let bytes = ArchiveBuilder::new()
            .admin_manifest("TestPlugin")
            .file("admin/index.js", "export default {}")
            .file("admin/components/Dashboard.tsx", "<div/>")
            .api_manifest("TestPlugin")
            .file("api/index.ts", "export {}")
            .build()
            .unwrap();

        let structure = inspect_archive(&bytes).unwrap();

        assert!(structure.has_admin_component);
        assert!(structure.has_api_component);
        assert_eq!(structure.plugin_id(), Some("TestPlugin"));
        assert_eq!(
            structure.admin_files.keys().collect::<Vec<_>>(),
            vec!["components/Dashboard.tsx", "index.js", "manifest.json"]
        );
        assert_eq!(structure.api_file_list, vec!["manifest.json", "index.ts"]);
        assert_eq!(
            structure.components(),
            vec![Component::Admin, Component::Api]
        );
    }

    #[test]
    fn test_api_only_archive_falls_back_to_api_manifest() {
        let bytes = ArchiveBuilder::new()
            .api_manifest("ApiOnly")
            .file("api/index.ts", "export {}")
            .build()
            .unwrap();

        let structure = inspect_archive(&bytes).unwrap();

        assert!(!structure.has_admin_component);
        assert!(structure.admin_manifest.is_none());
        assert_eq!(structure.plugin_id(), Some("ApiOnly"));
    }

    #[test]
    fn test_hidden_and_system_entries_are_skipped() {
        let bytes = ArchiveBuilder::new()
            .admin_manifest("TestPlugin")
            .file("admin/.DS_Store", "junk")
            .file("admin/assets/Thumbs.db", "junk")
            .file("admin/.git/config", "junk")
            .file("admin/__MACOSX/index.js", "junk")
            .file("__MACOSX/admin/._index.js", "junk")
            .file("README.md", "outside")
            .build()
            .unwrap();

        let structure = inspect_archive(&bytes).unwrap();
        assert_eq!(
            structure.admin_files.keys().collect::<Vec<_>>(),
            vec!["manifest.json"]
        );
    }

    #[test]
    fn test_directory_entries_are_not_files() {
        let bytes = ArchiveBuilder::new()
            .dir("admin/")
            .dir("admin/components/")
            .admin_manifest("TestPlugin")
            .build()
            .unwrap();

        let structure = inspect_archive(&bytes).unwrap();
        assert_eq!(structure.admin_files.len(), 1);
    }

    #[test]
    fn test_backslash_names_are_normalised() {
        let bytes = ArchiveBuilder::new()
            .file("admin\\manifest.json", &manifest_json("TestPlugin"))
            .file("admin\\lib\\util.js", "")
            .build()
            .unwrap();

        let structure = inspect_archive(&bytes).unwrap();
        assert!(structure.admin_files.contains_key("lib/util.js"));
    }

    #[test]
    fn test_not_a_zip_is_corrupt() {
        let err = inspect_archive(b"definitely not a zip").unwrap_err();
        assert!(matches!(err, ArchiveError::Corrupt(_)));
    }

    #[test]
    fn test_no_component_tree_is_structure_error() {
        let bytes = ArchiveBuilder::new()
            .file("plugin/manifest.json", "{}")
            .build()
            .unwrap();

        let err = inspect_archive(&bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::Structure));
        assert!(err
            .to_string()
            .contains("archive must contain either an admin or api component tree"));
    }

    #[test]
    fn test_tree_without_manifest() {
        let bytes = ArchiveBuilder::new()
            .admin_manifest("TestPlugin")
            .file("api/index.ts", "export {}")
            .build()
            .unwrap();

        let err = inspect_archive(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::MissingManifest {
                component: Component::Api
            }
        ));
    }

    #[test]
    fn test_manifest_missing_fields_propagates() {
        let bytes = ArchiveBuilder::new()
            .file("admin/manifest.json", r#"{"name": "Only Name"}"#)
            .build()
            .unwrap();

        let err = inspect_archive(&bytes).unwrap_err();
        let message = err.to_string();

        assert!(matches!(err, ArchiveError::Manifest(ManifestError::Schema { .. })));
        assert!(message.starts_with("Invalid admin manifest.json"));
        assert!(message.contains("pluginId"));
    }

    #[test]
    fn test_non_utf8_manifest_is_parse_error() {
        let bytes = ArchiveBuilder::new()
            .file_bytes("api/manifest.json", vec![0xff, 0xfe, 0x00])
            .build()
            .unwrap();

        let err = inspect_archive(&bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::Manifest(ManifestError::Parse { .. })));
        assert!(err.to_string().starts_with("Invalid api manifest.json"));
    }

    #[test]
    fn test_plugin_id_mismatch() {
        let bytes = ArchiveBuilder::new()
            .admin_manifest("AdminSide")
            .api_manifest("ApiSide")
            .build()
            .unwrap();

        let err = inspect_archive(&bytes).unwrap_err();
        assert!(matches!(err, ArchiveError::PluginIdMismatch { .. }));
        assert!(err.to_string().starts_with("Invalid api manifest.json"));
    }

    #[tokio::test]
    async fn test_validator_runs_inspection() {
        let bytes = ArchiveBuilder::new()
            .admin_manifest("TestPlugin")
            .build()
            .unwrap();

        let structure = ArchiveValidator::new().validate(bytes).await.unwrap();
        assert_eq!(structure.plugin_id(), Some("TestPlugin"));
    }

    #[test]
    fn test_selected_archive_digest() {
        let selected = SelectedArchive::new("plugin.zip", Vec::new());
        assert_eq!(selected.sha256().len(), 64);
    }

    /// Rewrite the central directory's uncompressed size for `entry`
    fn forge_declared_size(bytes: &mut [u8], entry: &str, size: u32) {
        let mut offset = 0;
        while offset + 46 <= bytes.len() {
            if bytes[offset..offset + 4] == [0x50, 0x4b, 0x01, 0x02] {
                let name_len =
                    u16::from_le_bytes([bytes[offset + 28], bytes[offset + 29]]) as usize;
                if &bytes[offset + 46..offset + 46 + name_len] == entry.as_bytes() {
                    bytes[offset + 24..offset + 28].copy_from_slice(&size.to_le_bytes());
                    return;
                }
            }
            offset += 1;
        }
        panic!("no central directory entry for {entry}");
    }

    #[test]
    fn test_entry_capacity_is_bounded() {
        assert_eq!(entry_capacity(0), 0);
        assert_eq!(entry_capacity(512), 512);
        assert_eq!(entry_capacity(u32::MAX as u64), MAX_ENTRY_PREALLOC as usize);
        assert_eq!(entry_capacity(u64::MAX), MAX_ENTRY_PREALLOC as usize);
    }

    #[test]
    fn test_forged_entry_size_reads_actual_content() {
        let mut bytes = ArchiveBuilder::new()
            .admin_manifest("TestPlugin")
            .file("admin/index.js", "export default {}")
            .build()
            .unwrap();
        forge_declared_size(&mut bytes, "admin/index.js", 0x7fff_0000);

        let structure = inspect_archive(&bytes).unwrap();
        assert_eq!(
            structure.admin_files.get("index.js").map(Vec::as_slice),
            Some(b"export default {}".as_slice())
        );
    }
}
