//! Configuration management for the plugin store

pub mod config;
pub mod plugins;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use config::Config;
pub use plugins::{CatalogConfig, PluginDirectoriesConfig, ViewConfig};
