//! # Billing API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Billing API Server                               │
//! │                                                                         │
//! │  Billing screens ───► HTTP (5000) ───► routes ───► SQL Server          │
//! │                                          │                              │
//! │                                          ▼                              │
//! │                                 pool + retrying executor                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use billing_api::config::ApiConfig;
use billing_api::server;
use billing_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,billing_api=debug,billing_db=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Billing API server...");

    let config = ApiConfig::load().context("failed to load server configuration")?;
    let db_config = DbConfig::from_env().context("failed to load database configuration")?;
    info!(
        port = config.port,
        env = ?config.environment,
        db = %db_config.target(),
        "Configuration loaded"
    );

    // Connects lazily on the first request.
    let db = Database::new(db_config);

    server::run(config, db).await?;
    Ok(())
}
