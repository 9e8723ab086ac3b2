//! Init command implementation

use crate::cli::utils;
use crate::Config;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;

pub fn command() -> Command {
    Command::new("init")
        .about("Initialize a new configuration file")
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("Output file path")
                .value_name("FILE")
                .default_value(".plugin-store.yaml"),
        )
        .arg(
            clap::Arg::new("local")
                .short('l')
                .long("local")
                .help("Keep plugins and catalog next to the configuration file")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("force")
                .short('f')
                .long("force")
                .help("Overwrite an existing configuration file")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let output_path = PathBuf::from(utils::required(matches, "output")?);

    if output_path.exists() && !matches.get_flag("force") {
        return Err(anyhow!(
            "Configuration file {:?} already exists. Use --force to overwrite it",
            output_path
        ));
    }

    info!("Initializing configuration file: {:?}", output_path);

    let config = if matches.get_flag("local") {
        create_local_config()
    } else {
        Config::default()
    };

    config.validate()?;
    config.save_to_file(&output_path)?;

    info!("Configuration file created: {:?}", output_path);

    println!("Configuration file created: {}", output_path.display());
    println!("Admin plugins: {}", config.plugins.admin_directory.display());
    println!("API plugins: {}", config.plugins.api_directory.display());
    match &config.catalog.path {
        Some(path) => println!("Catalog: {}", path.display()),
        None => println!("Catalog: in memory"),
    }

    Ok(())
}

fn create_local_config() -> Config {
    let mut config = Config::default();
    config.plugins.admin_directory = PathBuf::from("./plugins/admin");
    config.plugins.api_directory = PathBuf::from("./plugins/api");
    config.catalog.path = Some(PathBuf::from("./plugin-catalog.yaml"));
    config
}
