//! Detail view of an installed plugin: manifest merged with `info.json` and `README.md`

use crate::archive::{Component, MANIFEST_FILE};
use crate::installer::PluginFileService;
use plugin_manifest::{parse_manifest, validate_plugin_id, ManifestError, PluginManifest};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Optional metadata file next to the manifest
pub const INFO_FILE: &str = "info.json";

/// Optional readme next to the manifest
pub const README_FILE: &str = "README.md";

const DEFAULT_ICON: &str = "/images/logo512.png";
const DEFAULT_LICENSE: &str = "MIT";
const FEATURES_MARKER: &str = "Features:";
const ASSETS_PREFIX: &str = "assets/";

#[derive(thiserror::Error, Debug)]
pub enum DetailsError {
    #[error("Plugin {0} is not installed")]
    NotInstalled(String),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangelogEntry {
    pub version: String,
    pub date: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

/// Contents of `info.json`; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PluginInfo {
    features: Vec<String>,
    homepage: Option<String>,
    license: Option<String>,
    tags: Vec<String>,
    screenshots: Vec<String>,
    changelog: Vec<ChangelogEntry>,
}

/// Everything shown on a plugin's detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDetails {
    pub id: String,
    pub name: String,
    pub description: String,
    pub author: String,
    pub version: String,
    pub icon: String,
    pub homepage: String,
    pub license: String,
    pub tags: Vec<String>,
    pub readme: String,
    pub screenshots: Vec<String>,
    pub features: Vec<String>,
    pub changelog: Vec<ChangelogEntry>,
    /// Components found on disk, in detection order
    pub components: Vec<String>,
}

/// Read the details of an installed plugin.
///
/// The admin tree is preferred; an api-only plugin is described from its api tree.
pub async fn read_details(
    files: &PluginFileService,
    plugin_id: &str,
) -> Result<PluginDetails, DetailsError> {
    validate_plugin_id(plugin_id)?;

    let mut components = Vec::new();
    for component in [Component::Admin, Component::Api] {
        let dir = files.plugin_dir(component, plugin_id);
        if tokio::fs::try_exists(dir.join(MANIFEST_FILE)).await? {
            components.push(component);
        }
    }
    let Some(&source) = components.first() else {
        return Err(DetailsError::NotInstalled(plugin_id.to_string()));
    };

    let dir = files.plugin_dir(source, plugin_id);
    debug!("Reading details of {} from {:?}", plugin_id, dir);

    let manifest_path = dir.join(MANIFEST_FILE);
    let text = tokio::fs::read_to_string(&manifest_path).await?;
    let manifest = parse_manifest(&manifest_path.display().to_string(), &text)?;

    let info = read_info(&dir, plugin_id).await?;
    let readme = match tokio::fs::read(dir.join(README_FILE)).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    Ok(merge_details(
        manifest,
        info,
        readme,
        &dir,
        components.iter().map(|c| c.label().to_string()).collect(),
    ))
}

async fn read_info(dir: &Path, plugin_id: &str) -> Result<PluginInfo, DetailsError> {
    let bytes = match tokio::fs::read(dir.join(INFO_FILE)).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PluginInfo::default()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_slice(&bytes) {
        Ok(info) => Ok(info),
        Err(e) => {
            warn!("Ignoring unreadable {} for {}: {}", INFO_FILE, plugin_id, e);
            Ok(PluginInfo::default())
        }
    }
}

fn merge_details(
    manifest: PluginManifest,
    info: PluginInfo,
    readme: String,
    dir: &Path,
    components: Vec<String>,
) -> PluginDetails {
    let features = if info.features.is_empty() {
        readme_features(&readme)
    } else {
        info.features
    };

    let screenshots = info
        .screenshots
        .into_iter()
        .map(|shot| {
            if shot.starts_with(ASSETS_PREFIX) {
                dir.join(&shot).display().to_string()
            } else {
                shot
            }
        })
        .collect();

    let tags = if info.tags.is_empty() {
        manifest.tags
    } else {
        info.tags
    };

    PluginDetails {
        id: manifest.plugin_id,
        name: manifest.name,
        description: manifest.description,
        author: manifest.author,
        version: manifest.version,
        icon: non_empty(manifest.icon).unwrap_or_else(|| DEFAULT_ICON.to_string()),
        homepage: non_empty(info.homepage)
            .or(non_empty(manifest.homepage))
            .unwrap_or_default(),
        license: non_empty(info.license)
            .or(non_empty(manifest.license))
            .unwrap_or_else(|| DEFAULT_LICENSE.to_string()),
        tags,
        readme,
        screenshots,
        features,
        changelog: info.changelog,
        components,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Bullet lines following the first `Features:` marker of a readme
fn readme_features(readme: &str) -> Vec<String> {
    let Some((_, rest)) = readme.split_once(FEATURES_MARKER) else {
        return Vec::new();
    };

    rest.lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix('-'))
        .map(|item| item.trim().to_string())
        .collect()
}
