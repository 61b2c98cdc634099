use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ua_agent::{Cli, Config, agent};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if cli.check_config {
        agent::check(&config).context("invalid configuration")?;
        let redacted = serde_json::to_string_pretty(&config.redacted())
            .context("failed to render configuration")?;
        println!("{redacted}");
        return Ok(());
    }

    let summary = agent::run(&config).await?;
    tracing::debug!(?summary, "agent exited");
    Ok(())
}
