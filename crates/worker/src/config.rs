//! Worker configuration
//!
//! Read from the `worker` section of the shared configuration sources, e.g.
//! `APP_WORKER__POOL_SIZE=50` or `APP_WORKER__QUEUE__PREFIX=tournaments`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tourney_common::retry::RetryPolicy;

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of concurrent job loops
    pub pool_size: usize,

    /// Queue settings
    pub queue: QueueConfig,

    /// Retry policy for failed jobs
    pub retry: RetryConfig,

    /// Interval between metrics log lines (seconds)
    pub metrics_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: num_cpus::get(),
            queue: QueueConfig::default(),
            retry: RetryConfig::default(),
            metrics_interval_secs: 60,
        }
    }
}

impl WorkerConfig {
    /// Load the `worker` section, falling back to defaults when it is absent.
    pub fn load() -> Result<Self> {
        let sources = tourney_common::config::layered_sources()?;

        let config = match sources.get::<WorkerConfig>("worker") {
            Ok(config) => config,
            Err(config::ConfigError::NotFound(_)) => WorkerConfig::default(),
            Err(e) => return Err(e).context("Failed to deserialize worker configuration"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            anyhow::bail!("Worker pool size must be greater than 0");
        }

        if self.queue.prefix.is_empty() {
            anyhow::bail!("Queue prefix is required");
        }

        if self.queue.lease_timeout_ms == 0 {
            anyhow::bail!("Lease timeout must be greater than 0");
        }

        if self.queue.lease_timeout_ms > MAX_LEASE_TIMEOUT_MS {
            anyhow::bail!(
                "Lease timeout must not exceed {} ms, got {}",
                MAX_LEASE_TIMEOUT_MS,
                self.queue.lease_timeout_ms
            );
        }

        if self.metrics_interval_secs == 0 {
            anyhow::bail!("Metrics interval must be greater than 0");
        }

        if self.queue.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be greater than 0");
        }

        if self.retry.max_attempts == 0 {
            anyhow::bail!("Max attempts must be greater than 0");
        }

        Ok(())
    }
}

/// Longest lease a claimed job may hold (24 hours)
pub const MAX_LEASE_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

/// Delay queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Prefix for queue keys in Redis; API and workers must agree on it
    pub prefix: String,

    /// Sleep between polls when no job is due (milliseconds)
    pub poll_interval_ms: u64,

    /// How long a claimed job stays leased before it is redelivered (milliseconds)
    pub lease_timeout_ms: u64,

    /// Extra replace attempts when the job for a key is executing
    pub conflict_retries: u32,

    /// Pause between replace attempts (milliseconds)
    pub conflict_retry_delay_ms: u64,

    /// Completed jobs kept for inspection (0 removes them on completion)
    pub keep_completed: usize,

    /// Terminally failed jobs kept for inspection
    pub keep_failed: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            prefix: "tournamentProcessingWorkerQueue".to_string(),
            poll_interval_ms: 500,
            lease_timeout_ms: 5 * 60 * 1000,
            conflict_retries: 2,
            conflict_retry_delay_ms: 200,
            keep_completed: 0,
            keep_failed: 5,
        }
    }
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Lease length, clamped to [`MAX_LEASE_TIMEOUT_MS`]
    pub fn lease_timeout(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.lease_timeout_ms.min(MAX_LEASE_TIMEOUT_MS) as i64)
    }

    /// Retry policy applied when replacing a job that is currently active
    pub fn conflict_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::linear(
            self.conflict_retries,
            Duration::from_millis(self.conflict_retry_delay_ms),
        )
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of execution attempts per job
    pub max_attempts: u32,

    /// Initial backoff duration (milliseconds)
    pub initial_backoff_ms: u64,

    /// Maximum backoff duration (milliseconds)
    pub max_backoff_ms: u64,

    /// Backoff multiplier
    pub backoff_multiplier: f64,

    /// Whether to use exponential backoff
    pub exponential_backoff: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 5_000,
            max_backoff_ms: 300_000, // 5 minutes
            backoff_multiplier: 2.0,
            exponential_backoff: true,
        }
    }
}

impl RetryConfig {
    /// Calculate backoff duration after the given attempt (1-based)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        if !self.exponential_backoff {
            return Duration::from_millis(self.initial_backoff_ms);
        }

        let backoff = if attempt <= 1 {
            self.initial_backoff_ms
        } else {
            let exponential = (self.initial_backoff_ms as f64)
                * self.backoff_multiplier.powi(attempt as i32 - 1);
            exponential.min(self.max_backoff_ms as f64) as u64
        };

        Duration::from_millis(backoff)
    }
}
