//! Afribac AI command server

use afribac_config::AiConfig;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "afribac-web")]
#[command(about = "AI command server for the Afribac editor", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, short, env = "AFRIBAC_CONFIG")]
    config: Option<PathBuf>,

    /// Bind host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config)
    #[arg(long, short)]
    port: Option<u16>,

    /// Debug-level logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let mut config =
        AiConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.validate().context("Invalid configuration")?;

    afribac_web::start_server(config)
        .await
        .context("Web server failed")?;

    Ok(())
}
