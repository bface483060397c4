use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use gbq_toolkit::config::AppConfig;
use gbq_toolkit::telemetry::init_tracing;

/// Web form for loading CSV files into BigQuery and splitting CSV files
#[derive(Parser)]
#[command(name = "gbq-toolkit")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:8080 (overrides config file)
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(short = 'v', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen;
    }
    if let Some(level) = cli.log_level {
        config.server.log_level = level;
    }

    init_tracing(&config.server);
    config.validate()?;
    info!("Starting gbq-toolkit v{}", env!("CARGO_PKG_VERSION"));

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?
        .block_on(gbq_toolkit::run(config))
}
