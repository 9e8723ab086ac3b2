//! Uninstall command implementation

use crate::cli::utils;
use crate::lifecycle::UninstallMode;
use anyhow::Result;
use clap::{ArgMatches, Command};
use tracing::info;

pub fn command() -> Command {
    Command::new("uninstall")
        .about("Uninstall a plugin, removing its files unless --keep-data is given")
        .arg(utils::plugin_id_arg())
        .arg(utils::config_arg())
        .arg(
            clap::Arg::new("keep-data")
                .short('k')
                .long("keep-data")
                .help("Keep the catalog record and installed files")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let plugin_id = utils::required(matches, "plugin_id")?;
    let mode = if matches.get_flag("keep-data") {
        UninstallMode::KeepData
    } else {
        UninstallMode::RemovePermanently
    };
    let store = utils::create_store(utils::load_config(matches)?).await?;

    info!("Uninstalling plugin {} ({:?})", plugin_id, mode);
    let lifecycle = store.lifecycle();
    lifecycle.request_uninstall(plugin_id).await;
    let report = lifecycle.confirm_uninstall(mode).await?;

    match report.files_removed {
        None => println!("Plugin {} uninstalled, data kept", plugin_id),
        Some(true) => println!("Plugin {} removed permanently", plugin_id),
        Some(false) => println!(
            "Plugin {} uninstalled, but its files could not be removed",
            plugin_id
        ),
    }
    if !report.record_found {
        println!("No catalog record was found for {}", plugin_id);
    }

    Ok(())
}
