//! Tourney Scheduler Worker
//!
//! Deferred tournament processing for the scheduler.
//!
//! This crate provides:
//! - A delay queue with one pending job per tournament (Redis or in-memory)
//! - The scheduler that upserts processing jobs at the application deadline
//! - A worker pool that claims due jobs and generates match ladders
//! - Retry with backoff and retention of terminal failures
//! - Metrics and monitoring

pub mod config;
pub mod metrics;
pub mod queue;
pub mod scheduler;
pub mod workers;

pub use config::{QueueConfig, RetryConfig, WorkerConfig};
pub use metrics::{MetricsSnapshot, WorkerMetrics};
pub use queue::{DelayQueue, InMemoryDelayQueue, JobConsumer, RedisDelayQueue};
pub use scheduler::{ProcessingScheduler, ScheduleReceipt};
pub use workers::{LadderWorker, Worker};

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Worker pool for processing due jobs
pub struct WorkerPool {
    config: WorkerConfig,
    consumer: JobConsumer,
    metrics: WorkerMetrics,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl WorkerPool {
    /// Create a new worker pool
    pub fn new(config: WorkerConfig, queue: Arc<dyn DelayQueue>, worker: Arc<dyn Worker>) -> Self {
        let metrics = WorkerMetrics::new();
        let consumer = JobConsumer::new(queue, worker, metrics.clone(), config.queue.poll_interval());
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            config,
            consumer,
            metrics,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    /// Run the worker loops until shutdown is signalled.
    ///
    /// Jobs already claimed finish before this returns.
    pub async fn start(&self) {
        info!(pool_size = self.config.pool_size, "Starting worker pool");

        let handles: Vec<_> = (0..self.config.pool_size)
            .map(|worker_id| {
                let consumer = self.consumer.clone();
                let shutdown = self.shutdown_tx.subscribe();
                tokio::spawn(async move { consumer.worker_loop(worker_id, shutdown).await })
            })
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Worker thread error: {}", e);
            }
        }

        info!("Worker pool stopped");
    }

    /// Get a handle to send shutdown signal
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(self.shutdown_tx.clone())
    }

    /// Get metrics
    pub fn metrics(&self) -> &WorkerMetrics {
        &self.metrics
    }
}

/// Signals a [`WorkerPool`] to stop after the jobs in flight
#[derive(Clone)]
pub struct ShutdownHandle(Arc<watch::Sender<bool>>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }
}
