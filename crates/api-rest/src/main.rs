//! Tourney Scheduler API server

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tourney_api::{create_app, ApiConfig, AppState};
use tourney_common::init_tracing;
use tourney_worker::RedisDelayQueue;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ApiConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.telemetry)?;

    let queue = RedisDelayQueue::connect(&config.redis_url, config.queue.clone(), config.retry.clone())
        .await
        .context("Failed to connect to Redis")?;

    let address = config.server_address();
    let app = create_app(AppState::new(config, Arc::new(queue)));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(address = %address, "Tourney Scheduler API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await
        .context("Server error")?;

    Ok(())
}
