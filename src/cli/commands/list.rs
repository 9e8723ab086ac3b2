//! List command implementation

use crate::cli::utils;
use crate::view::PluginFilter;
use anyhow::{anyhow, Result};
use clap::{ArgMatches, Command};

pub fn command() -> Command {
    Command::new("list")
        .about("List uploaded and loaded plugins")
        .arg(utils::config_arg())
        .arg(
            clap::Arg::new("search")
                .short('s')
                .long("search")
                .help("Match name or description, case-insensitive")
                .value_name("TERM"),
        )
        .arg(
            clap::Arg::new("installed")
                .short('i')
                .long("installed")
                .help("Only show installed plugins")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("page")
                .short('p')
                .long("page")
                .help("Page number, starting at 1")
                .value_name("N")
                .value_parser(clap::value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            clap::Arg::new("page-size")
                .long("page-size")
                .help("Plugins per page (defaults to the configured size)")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            clap::Arg::new("json")
                .long("json")
                .help("Print the page as JSON")
                .action(clap::ArgAction::SetTrue),
        )
}

pub async fn run(matches: &ArgMatches) -> Result<()> {
    let config = utils::load_config(matches)?;
    let store = utils::create_store(config).await?;
    let mut view = store.list_view().await?;

    let state = view.state_mut();
    if let Some(page_size) = matches.get_one::<usize>("page-size") {
        state.set_page_size(*page_size);
    }
    if matches.get_flag("installed") {
        state.set_filter(PluginFilter::Installed);
    }
    if let Some(term) = matches.get_one::<String>("search") {
        state.set_search_term(term.as_str());
    }
    let page = matches.get_one::<usize>("page").copied().unwrap_or(1);
    if page == 0 {
        return Err(anyhow!("Page numbers start at 1"));
    }
    state.set_page(page - 1);

    let page = view.page();

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.entries.is_empty() {
        println!("No plugins found");
        return Ok(());
    }

    for entry in &page.entries {
        let state = if entry.installed {
            entry.status.to_string()
        } else {
            "not installed".to_string()
        };
        println!("{} [{}]", entry.name, state);
        println!("  ID: {}", entry.id);
        println!("  Author: {}", entry.author);
        println!("  {}", entry.description);
    }
    println!(
        "\nPage {} of {} ({} of {} plugins)",
        page.page + 1,
        page.page_count().max(1),
        page.filtered_count,
        page.total_count
    );

    Ok(())
}
