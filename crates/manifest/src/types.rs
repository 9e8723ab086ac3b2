//! Manifest data structures

use serde::{Deserialize, Serialize};

/// Metadata describing a plugin's identity, version and entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Human readable plugin name
    pub name: String,

    /// Unique plugin identifier
    pub plugin_id: String,

    /// Plugin version
    pub version: String,

    /// Plugin description
    pub description: String,

    /// Plugin author
    pub author: String,

    /// Entry point file name
    pub main: String,

    /// Icon path or URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Project homepage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,

    /// License identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    /// Free-form tags, order preserved
    #[serde(default)]
    pub tags: Vec<String>,

    /// Route registrations contributed by the plugin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_points: Option<Vec<RouteExtension>>,
}

/// A route registration descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteExtension {
    /// Owning plugin identifier
    pub plugin_id: String,

    /// Route path
    pub path: String,

    /// Component name rendered for the route
    pub component: String,

    /// Whether the path must match exactly
    #[serde(default)]
    pub exact: bool,
}

impl PluginManifest {
    /// Route registrations, empty when the manifest declares none
    pub fn routes(&self) -> &[RouteExtension] {
        self.extension_points.as_deref().unwrap_or(&[])
    }
}
