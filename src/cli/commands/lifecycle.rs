//! Install, activate and deactivate commands

use crate::cli::utils;
use anyhow::Result;
use clap::{ArgMatches, Command};
use tracing::info;

pub fn install_command() -> Command {
    Command::new("install")
        .about("Install an uploaded plugin and load it")
        .arg(utils::plugin_id_arg())
        .arg(utils::config_arg())
}

pub fn activate_command() -> Command {
    Command::new("activate")
        .about("Activate an installed plugin")
        .arg(utils::plugin_id_arg())
        .arg(utils::config_arg())
}

pub fn deactivate_command() -> Command {
    Command::new("deactivate")
        .about("Deactivate an installed plugin")
        .arg(utils::plugin_id_arg())
        .arg(utils::config_arg())
}

pub async fn run_install(matches: &ArgMatches) -> Result<()> {
    let plugin_id = utils::required(matches, "plugin_id")?;
    let store = utils::create_store(utils::load_config(matches)?).await?;

    info!("Installing plugin {}", plugin_id);
    store.lifecycle().install(plugin_id).await?;

    println!("Plugin {} installed", plugin_id);
    Ok(())
}

pub async fn run_activate(matches: &ArgMatches) -> Result<()> {
    let plugin_id = utils::required(matches, "plugin_id")?;
    let store = utils::create_store(utils::load_config(matches)?).await?;

    info!("Activating plugin {}", plugin_id);
    store.lifecycle().activate(plugin_id).await?;

    println!("Plugin {} activated", plugin_id);
    Ok(())
}

pub async fn run_deactivate(matches: &ArgMatches) -> Result<()> {
    let plugin_id = utils::required(matches, "plugin_id")?;
    let store = utils::create_store(utils::load_config(matches)?).await?;

    info!("Deactivating plugin {}", plugin_id);
    store.lifecycle().deactivate(plugin_id).await?;

    println!("Plugin {} deactivated", plugin_id);
    Ok(())
}
