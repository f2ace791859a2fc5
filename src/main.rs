// =============================================================================
// EtfScope — ETF technical analysis service
// =============================================================================
//
// Startup sequence: load .env overrides, initialise structured logging, load
// the JSON config (falling back to defaults), build the shared state, and
// serve the REST API until ctrl-c.

mod analysis;
mod api;
mod app_state;
mod cache;
mod config;
mod error;
mod indicators;
mod provider;
mod scorer;
mod tools;
mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::AppConfig;

const DEFAULT_CONFIG_PATH: &str = "etfscope.json";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path =
        std::env::var("ETFSCOPE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = AppConfig::load_or_default(&config_path);

    if let Ok(bind_addr) = std::env::var("ETFSCOPE_BIND") {
        config.bind_addr = bind_addr;
    }

    let state = Arc::new(AppState::new(config).context("failed to build application state")?);
    let bind_addr = state.config.bind_addr.clone();

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "serving REST API");

    axum::serve(listener, api::rest::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
