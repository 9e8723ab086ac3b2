//! Info command implementation

use anyhow::Result;
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("info").about("Show tool information").arg(
        clap::Arg::new("detailed")
            .short('d')
            .long("detailed")
            .help("Show detailed information")
            .action(clap::ArgAction::SetTrue),
    )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let detailed = matches.get_flag("detailed");

    println!("Talawa Plugin Store - admin plugin ingestion and lifecycle");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));

    if detailed {
        println!("\nDetailed Information:");
        println!("  - Plugin archives hold admin/ and api/ component trees");
        println!("  - Every component carries a manifest.json with matching pluginId");
        println!("  - Uploaded plugins are registered but not installed");
        println!("  - Install, activate and deactivate update the catalog before the runtime");
        println!("  - Uninstall can keep plugin data or remove it permanently");
        println!("  - Logging is controlled with RUST_LOG");
    }

    Ok(())
}
