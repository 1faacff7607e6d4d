//! # WX Node
//!
//! Runs the callback endpoint configured from `WX_*` environment variables.
//! `RUST_LOG` takes precedence over `WX_LOG_LEVEL`.

use anyhow::Result;
use node_runtime::{NodeConfig, NodeRuntime};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting wx-node");

    let runtime = NodeRuntime::new(config)?;
    runtime.serve(shutdown_signal()).await
}
