//! Tourney Scheduler Worker
//!
//! Background worker that generates match ladders once application deadlines pass.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tourney_common::{init_tracing, AppConfig, DatabaseConfig};
use tourney_infrastructure::{DatabasePool, PgTournamentRepository};
use tourney_worker::{LadderWorker, RedisDelayQueue, WorkerConfig, WorkerPool};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Worker pool size
    #[arg(short, long, env = "WORKER_POOL_SIZE")]
    workers: Option<usize>,

    /// Redis connection URL
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Create the tournament tables if they do not exist
    #[arg(long)]
    init_schema: bool,

    /// Print metrics interval (seconds)
    #[arg(long, env = "METRICS_INTERVAL")]
    metrics_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut app_config = AppConfig::load().context("Failed to load configuration")?;
    let mut config = WorkerConfig::load().context("Failed to load worker configuration")?;

    // Override with CLI arguments
    if let Some(workers) = args.workers {
        config.pool_size = workers;
    }
    if let Some(interval) = args.metrics_interval {
        config.metrics_interval_secs = interval;
    }
    if let Some(redis_url) = args.redis_url {
        app_config.redis.url = redis_url;
    }
    if let Some(database_url) = args.database_url {
        match app_config.database.as_mut() {
            Some(database) => database.url = database_url,
            None => app_config.database = Some(DatabaseConfig::new(database_url)),
        }
    }
    config.validate()?;

    init_tracing(&app_config.telemetry)?;

    info!(
        pool_size = config.pool_size,
        queue_prefix = %config.queue.prefix,
        "Starting Tourney Scheduler worker"
    );

    let database = DatabasePool::new(app_config.require_database()?)
        .await
        .context("Failed to connect to database")?;
    let health = database.health_check().await;
    if !health.healthy {
        anyhow::bail!(
            "Database health check failed: {}",
            health.error.unwrap_or_default()
        );
    }
    info!(latency_ms = health.latency.as_millis() as u64, "Database reachable");
    if args.init_schema {
        database
            .ensure_schema()
            .await
            .context("Failed to create tournament schema")?;
    }

    let queue = RedisDelayQueue::connect(
        &app_config.redis.url,
        config.queue.clone(),
        config.retry.clone(),
    )
    .await
    .context("Failed to connect to Redis")?;

    let repository = Arc::new(PgTournamentRepository::new(database.pool().clone()));
    let worker = Arc::new(LadderWorker::new(repository));
    let metrics_interval = Duration::from_secs(config.metrics_interval_secs);
    let pool = WorkerPool::new(config, Arc::new(queue), worker);

    // Setup graceful shutdown
    let shutdown_handle = pool.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        info!("Received shutdown signal");
        shutdown_handle.shutdown();
    });

    // Start metrics reporting
    let metrics = pool.metrics().clone();
    let metrics_database = database.clone();
    let metrics_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(metrics_interval);
        loop {
            interval.tick().await;
            let health = metrics_database.health_check().await;
            if !health.healthy {
                warn!(error = ?health.error, "Database unreachable");
            }
            let snapshot = metrics.snapshot();
            info!(
                jobs_processed = snapshot.jobs_processed,
                jobs_completed = snapshot.jobs_completed,
                jobs_retried = snapshot.jobs_retried,
                jobs_failed = snapshot.jobs_failed,
                duplicates_skipped = snapshot.duplicates_skipped,
                stale_acks = snapshot.stale_acks,
                success_rate = format!("{:.2}%", snapshot.success_rate() * 100.0),
                avg_duration_ms = snapshot.average_duration.map(|d| d.as_millis() as u64).unwrap_or(0),
                p95_duration_ms = snapshot.p95_duration.map(|d| d.as_millis() as u64).unwrap_or(0),
                db_pool_size = health.pool_size,
                db_latency_ms = health.latency.as_millis() as u64,
                "Worker metrics"
            );
        }
    });

    pool.start().await;

    metrics_handle.abort();
    database.close().await;

    info!("Worker shutting down gracefully");

    Ok(())
}
