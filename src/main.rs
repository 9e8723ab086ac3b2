//! Plugin store CLI binary

use anyhow::Result;

use talawa_plugin_store::cli::CliApp;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talawa_plugin_store=info".into()),
        )
        .init();

    let matches = CliApp::app().get_matches();

    CliApp::run(&matches).await
}
