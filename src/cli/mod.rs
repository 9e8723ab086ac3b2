//! CLI command implementations

use anyhow::Result;
use clap::{ArgMatches, Command};

pub mod commands;

/// Main CLI application
pub struct CliApp;

impl CliApp {
    /// Create the CLI application
    pub fn app() -> Command {
        Command::new("plugin-store")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Upload, install and manage Talawa admin plugins")
            .subcommand_negates_reqs(true)
            .subcommand(commands::init::command())
            .subcommand(commands::validate::command())
            .subcommand(commands::upload::command())
            .subcommand(commands::list::command())
            .subcommand(commands::installed::command())
            .subcommand(commands::details::command())
            .subcommand(commands::lifecycle::install_command())
            .subcommand(commands::lifecycle::activate_command())
            .subcommand(commands::lifecycle::deactivate_command())
            .subcommand(commands::uninstall::command())
            .subcommand(commands::info::command())
    }

    /// Run the CLI application
    pub async fn run(matches: &ArgMatches) -> Result<()> {
        match matches.subcommand() {
            Some(("init", sub_matches)) => commands::init::run(sub_matches).await,
            Some(("validate", sub_matches)) => commands::validate::run(sub_matches).await,
            Some(("upload", sub_matches)) => commands::upload::run(sub_matches).await,
            Some(("list", sub_matches)) => commands::list::run(sub_matches).await,
            Some(("installed", sub_matches)) => commands::installed::run(sub_matches).await,
            Some(("details", sub_matches)) => commands::details::run(sub_matches).await,
            Some(("install", sub_matches)) => commands::lifecycle::run_install(sub_matches).await,
            Some(("activate", sub_matches)) => {
                commands::lifecycle::run_activate(sub_matches).await
            }
            Some(("deactivate", sub_matches)) => {
                commands::lifecycle::run_deactivate(sub_matches).await
            }
            Some(("uninstall", sub_matches)) => commands::uninstall::run(sub_matches).await,
            Some(("info", sub_matches)) => commands::info::run(sub_matches).await,
            _ => {
                // No subcommand provided, show help
                let _ = Self::app().print_help();
                Ok(())
            }
        }
    }
}

/// Common CLI utilities
pub mod utils {
    use crate::archive::SelectedArchive;
    use anyhow::{anyhow, Result};
    use clap::{Arg, ArgMatches};
    use std::path::{Path, PathBuf};

    /// The `--config` argument shared by every command that loads configuration
    pub fn config_arg() -> Arg {
        Arg::new("config")
            .short('c')
            .long("config")
            .help("Configuration file path")
            .value_name("FILE")
    }

    /// Required positional plugin id argument
    pub fn plugin_id_arg() -> Arg {
        Arg::new("plugin_id")
            .help("Plugin identifier")
            .value_name("PLUGIN_ID")
            .required(true)
    }

    /// Get configuration file path from arguments or use default
    pub fn get_config_path(matches: &ArgMatches) -> Result<PathBuf> {
        if let Some(config_path) = matches.get_one::<String>("config") {
            Ok(PathBuf::from(config_path))
        } else {
            // Look for default config files
            let default_paths = [
                PathBuf::from(".plugin-store.yaml"),
                PathBuf::from(".plugin-store.yml"),
                PathBuf::from("plugin-store.yaml"),
                PathBuf::from("plugin-store.yml"),
            ];

            for path in &default_paths {
                if path.exists() {
                    return Ok(path.clone());
                }
            }

            Err(anyhow!("No configuration file found. Use --config to specify a file or create one with 'plugin-store init'"))
        }
    }

    /// Load configuration from file
    pub fn load_config(matches: &ArgMatches) -> Result<crate::Config> {
        let config_path = get_config_path(matches)?;
        crate::Config::from_file(&config_path)
    }

    /// Create a store and hydrate its runtime from the catalog
    pub async fn create_store(config: crate::Config) -> Result<crate::PluginStore> {
        let store = crate::PluginStore::new(config).await?;
        store.initialize().await?;
        Ok(store)
    }

    /// Read an archive file from disk
    pub async fn read_archive(path: &Path) -> Result<SelectedArchive> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| anyhow!("Failed to read {:?}: {}", path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(SelectedArchive::new(file_name, bytes))
    }

    pub fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String> {
        matches
            .get_one::<String>(name)
            .ok_or_else(|| anyhow!("Missing argument: {}", name))
    }
}
