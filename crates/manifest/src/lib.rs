//! Plugin manifest parsing and schema checking
//!
//! A manifest is the `manifest.json` found at the root of an `admin/` or `api/`
//! component tree. Parsing never panics and never uses errors for normal control
//! flow beyond the tagged [`ManifestError`] result.

pub mod error;
pub mod parser;
pub mod types;

pub use error::ManifestError;
pub use parser::{parse_manifest, validate_plugin_id, REQUIRED_FIELDS};
pub use types::{PluginManifest, RouteExtension};
