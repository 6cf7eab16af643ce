//! API configuration.

use anyhow::Result;
use std::time::Duration;
use tourney_common::{AppConfig, TelemetryConfig};
use tourney_worker::{QueueConfig, RetryConfig, WorkerConfig};

/// API configuration
///
/// The queue and retry sections are shared with the worker so both processes
/// agree on the Redis key prefix and on the attempts given to new jobs.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host to bind to
    pub host: String,

    /// Server port to bind to
    pub port: u16,

    /// Request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Redis connection URL
    pub redis_url: String,

    /// Delay queue settings
    pub queue: QueueConfig,

    /// Retry settings stamped on newly scheduled jobs
    pub retry: RetryConfig,

    /// Logging setup
    pub telemetry: TelemetryConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::from_parts(AppConfig::default(), WorkerConfig::default())
    }
}

impl ApiConfig {
    /// Load from the layered configuration sources
    pub fn load() -> Result<Self> {
        Ok(Self::from_parts(AppConfig::load()?, WorkerConfig::load()?))
    }

    fn from_parts(app: AppConfig, worker: WorkerConfig) -> Self {
        Self {
            host: app.server.host,
            port: app.server.port,
            request_timeout_seconds: app.server.request_timeout_seconds,
            redis_url: app.redis.url,
            queue: worker.queue,
            retry: worker.retry,
            telemetry: app.telemetry,
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Get server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
