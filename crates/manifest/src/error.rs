//! Manifest error types

/// Errors produced while reading a plugin manifest
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    /// The manifest text is not a JSON object of the expected shape
    #[error("Invalid {file}: {detail}")]
    Parse { file: String, detail: String },

    /// The manifest parsed but one or more required fields are missing or empty
    #[error("Invalid {file}: missing required field(s): {}", .missing.join(", "))]
    Schema { file: String, missing: Vec<String> },

    /// The plugin identifier does not satisfy the identity rule
    #[error("Invalid plugin ID '{plugin_id}': {reason}")]
    InvalidPluginId { plugin_id: String, reason: String },
}

impl ManifestError {
    /// Names of the missing required fields, empty for non-schema errors
    pub fn missing_fields(&self) -> &[String] {
        match self {
            ManifestError::Schema { missing, .. } => missing,
            _ => &[],
        }
    }
}
