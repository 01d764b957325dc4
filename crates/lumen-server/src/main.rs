//! # Lumen Server
//!
//! Shares one on/off actuator between many WebSocket clients.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings (page on :8080, sessions on :8081)
//! lumen
//!
//! # Run with a custom config
//! LUMEN_CONFIG=/path/to/lumen.toml lumen
//!
//! # Run with environment variables
//! LUMEN_HTTP_PORT=80 LUMEN_WS_PORT=81 lumen
//! ```

mod bridge;
mod config;
mod devices;
mod handlers;
mod metrics;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen=debug,lumen_core=debug,lumen_transport=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;

    tracing::info!(
        "Starting Lumen on {} (http {}, ws {})",
        config.host,
        config.http_port,
        config.ws_port
    );

    // Initialize metrics
    if config.metrics.enabled {
        metrics::init_metrics();
    }

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
