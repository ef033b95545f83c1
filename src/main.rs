use anyhow::{Context, Result};
use clap::Parser;
use jobflow::cli::{handle_command, Cli};
use jobflow::core::ConfigManager;
use std::fs::OpenOptions;
use tracing::{error, info};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging first
    let log_path = ConfigManager::log_file_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ConfigManager::load()?;
    info!(
        "Environment: {}",
        jobflow::environment::EnvironmentConfig::get_environment()
    );

    if let Err(e) = handle_command(cli, config).await {
        error!("Command failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}
