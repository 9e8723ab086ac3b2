//! Validate command implementation

use crate::archive::ArchiveValidator;
use crate::cli::utils;
use crate::utils::format_bytes;
use anyhow::Result;
use clap::{ArgMatches, Command};
use std::path::PathBuf;
use tracing::info;

pub fn command() -> Command {
    Command::new("validate")
        .about("Validate a plugin archive without installing it")
        .arg(
            clap::Arg::new("archive")
                .help("Plugin archive (.zip)")
                .value_name("ARCHIVE")
                .required(true),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let path = PathBuf::from(utils::required(matches, "archive")?);
    info!("Validating plugin archive {:?}", path);

    let selected = utils::read_archive(&path).await?;
    let size = selected.bytes.len() as u64;
    let structure = ArchiveValidator::new().validate(selected.bytes).await?;

    println!("Plugin archive is valid!");
    println!("Size: {}", format_bytes(size));
    if let Some(manifest) = structure.manifest() {
        println!("Name: {}", manifest.name);
        println!("Plugin ID: {}", manifest.plugin_id);
        println!("Version: {}", manifest.version);
        println!("Author: {}", manifest.author);
        println!("Description: {}", manifest.description);
    }
    println!("Components:");
    for component in structure.components() {
        println!(
            "  - {} ({} files)",
            component.label(),
            structure.files(component).len()
        );
    }

    Ok(())
}
