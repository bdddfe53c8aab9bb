use models::{CliApp, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod cli;
mod config;
mod database;
mod email_sender;
mod export;
mod ingest;
mod models;
mod outreach;
mod server;
mod template;

use config::{load_config, Config};
use database::create_db_pool;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = match load_config("config.yml").await {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config.yml: {}. Using defaults.", e);
            Config::default()
        }
    };

    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("lead_outreach=info".parse().unwrap()),
        )
        .with_max_level(tracing::Level::INFO)
        .init();

    // Create output directory
    tokio::fs::create_dir_all(&config.output.directory).await?;

    // Initialize database
    info!("Initializing database...");
    let db_pool = create_db_pool("data/outreach.db").await?;

    // `serve` runs the HTTP API; anything else gets the interactive CLI
    if std::env::args().any(|arg| arg == "serve") {
        info!("Starting API server...");
        let _ = server::build_rocket(config, db_pool).launch().await?;
        return Ok(());
    }

    let app = CliApp::new(config, db_pool).await?;

    // Add graceful shutdown
    tokio::select! {
        result = app.run() => {
            result?;
        }
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
