use anyhow::Result;
use model_server::{config, server};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Parses a log level name into a filter
fn parse_log_level(level: &str) -> Result<LevelFilter> {
    level.parse::<LevelFilter>().map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
            level
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let level = match parse_log_level(&config.server.logs.level) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG, when set, takes precedence over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string())),
        )
        .json()
        .init();

    info!(
        model = %config.model.name,
        task = %config.model.task,
        "Starting model server with log level: {}",
        level
    );

    server::run(config).await?;

    Ok(())
}
