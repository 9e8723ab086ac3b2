//! Upload command implementation

use crate::cli::utils;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;

pub fn command() -> Command {
    Command::new("upload")
        .about("Validate a plugin archive and register it in the catalog")
        .arg(
            clap::Arg::new("archive")
                .help("Plugin archive (.zip)")
                .value_name("ARCHIVE")
                .required(true),
        )
        .arg(utils::config_arg())
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let path = PathBuf::from(utils::required(matches, "archive")?);
    let config = utils::load_config(matches)?;
    let store = utils::create_store(config).await?;

    info!("Uploading plugin archive {:?}", path);
    let selected = utils::read_archive(&path).await?;
    let result = store.upload(selected).await?;

    if !result.success {
        return Err(anyhow!(
            "Failed to upload plugin: {}",
            result.error.as_deref().unwrap_or(crate::utils::UNKNOWN_ERROR)
        ));
    }

    println!("Plugin {} uploaded", result.plugin_id);
    println!("Components: {}", result.installed_components.join(", "));
    println!("Files written: {}", result.files_written);
    println!("Archive SHA-256: {}", result.archive_sha256);
    println!(
        "Run 'plugin-store install {}' to install it",
        result.plugin_id
    );

    Ok(())
}
