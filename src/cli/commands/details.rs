//! Details command implementation

use crate::cli::utils;
use anyhow::Result;
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("details")
        .about("Show the detail page of an installed plugin")
        .arg(utils::config_arg())
        .arg(utils::plugin_id_arg())
        .arg(
            clap::Arg::new("json")
                .long("json")
                .help("Print the details as JSON")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let plugin_id = utils::required(matches, "plugin_id")?;
    let config = utils::load_config(matches)?;
    let store = crate::PluginStore::new(config).await?;
    let details = store.plugin_details(plugin_id).await?;

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    println!("{} v{}", details.name, details.version);
    println!("ID: {}", details.id);
    println!("Author: {}", details.author);
    println!("License: {}", details.license);
    if !details.homepage.is_empty() {
        println!("Homepage: {}", details.homepage);
    }
    if !details.tags.is_empty() {
        println!("Tags: {}", details.tags.join(", "));
    }
    println!("Components: {}", details.components.join(", "));
    println!("\n{}", details.description);

    if !details.features.is_empty() {
        println!("\nFeatures:");
        for feature in &details.features {
            println!("  - {}", feature);
        }
    }
    if !details.screenshots.is_empty() {
        println!("\nScreenshots:");
        for screenshot in &details.screenshots {
            println!("  - {}", screenshot);
        }
    }
    for entry in &details.changelog {
        println!("\n{} ({})", entry.version, entry.date);
        for change in &entry.changes {
            println!("  - {}", change);
        }
    }

    Ok(())
}
