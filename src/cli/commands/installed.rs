//! Installed command implementation

use crate::archive::Component;
use crate::cli::utils;
use anyhow::Result;
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("installed")
        .about("List plugin directories present on disk")
        .arg(utils::config_arg())
        .arg(
            clap::Arg::new("component")
                .long("component")
                .help("Only list one component")
                .value_name("COMPONENT")
                .value_parser(["admin", "api"]),
        )
        .arg(
            clap::Arg::new("json")
                .long("json")
                .help("Print the manifests as JSON")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let config = utils::load_config(matches)?;
    let store = crate::PluginStore::new(config).await?;

    let components = match matches.get_one::<String>("component").map(String::as_str) {
        Some("admin") => vec![Component::Admin],
        Some("api") => vec![Component::Api],
        _ => vec![Component::Admin, Component::Api],
    };

    if matches.get_flag("json") {
        let listing: serde_json::Map<String, serde_json::Value> = components
            .iter()
            .map(|c| -> Result<(String, serde_json::Value)> {
                let manifests = store.installed_plugins(*c);
                Ok((c.dir_name().to_string(), serde_json::to_value(manifests)?))
            })
            .collect::<Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for component in components {
        let manifests = store.installed_plugins(component);
        println!("{} ({}):", component.label(), manifests.len());
        for manifest in manifests {
            println!(
                "  - {} ({}) v{}",
                manifest.name, manifest.plugin_id, manifest.version
            );
        }
    }

    Ok(())
}
