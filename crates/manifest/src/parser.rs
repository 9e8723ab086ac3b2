//! Manifest parser and schema checker

use crate::error::ManifestError;
use crate::types::PluginManifest;
use serde_json::Value;
use tracing::debug;

/// Fields every manifest must carry as non-empty strings, in report order
pub const REQUIRED_FIELDS: [&str; 6] = ["name", "pluginId", "version", "description", "author", "main"];

const PLUGIN_ID_MIN_LEN: usize = 3;
const PLUGIN_ID_MAX_LEN: usize = 50;

/// Parse manifest text and check the required fields.
///
/// `file_name` only labels errors, e.g. `admin/manifest.json`.
pub fn parse_manifest(file_name: &str, text: &str) -> Result<PluginManifest, ManifestError> {
    let value: Value = serde_json::from_str(text).map_err(|e| parse_error(file_name, e))?;

    let Some(object) = value.as_object() else {
        return Err(parse_error(file_name, "manifest must be a JSON object"));
    };

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !is_present(object.get(**field)))
        .map(|field| field.to_string())
        .collect();

    if !missing.is_empty() {
        debug!("{} is missing required fields: {:?}", file_name, missing);
        return Err(ManifestError::Schema {
            file: file_name.to_string(),
            missing,
        });
    }

    serde_json::from_value(value).map_err(|e| parse_error(file_name, e))
}

/// Check a plugin identifier.
///
/// Identifiers are prefixed onto generated GraphQL operation names, so they must
/// start with a letter and contain only letters, digits and underscores.
pub fn validate_plugin_id(plugin_id: &str) -> Result<(), ManifestError> {
    let invalid = |reason: &str| ManifestError::InvalidPluginId {
        plugin_id: plugin_id.to_string(),
        reason: reason.to_string(),
    };

    let mut chars = plugin_id.chars();
    match chars.next() {
        None => return Err(invalid("plugin ID is required")),
        Some(first) if !first.is_ascii_alphabetic() => {
            return Err(invalid("must start with a letter"));
        }
        Some(_) => {}
    }

    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid(
            "must contain only letters, numbers, and underscores (no hyphens)",
        ));
    }

    let len = plugin_id.len();
    if !(PLUGIN_ID_MIN_LEN..=PLUGIN_ID_MAX_LEN).contains(&len) {
        return Err(invalid(&format!(
            "must be between {PLUGIN_ID_MIN_LEN} and {PLUGIN_ID_MAX_LEN} characters"
        )));
    }

    Ok(())
}

fn is_present(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.trim().is_empty())
}

fn parse_error(file_name: &str, detail: impl std::fmt::Display) -> ManifestError {
    ManifestError::Parse {
        file: file_name.to_string(),
        detail: detail.to_string(),
    }
}
