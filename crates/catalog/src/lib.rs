//! Plugin catalog: the registry of known plugins and their install/activation flags

pub mod catalog;
pub mod store;
pub mod types;

pub use catalog::{CatalogError, CatalogResult, PluginCatalog};
pub use store::FileCatalog;
pub use types::{InstalledPluginRecord, PluginUpdate};
