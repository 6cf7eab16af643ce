//! Common utilities shared by the tourney scheduler services.
//!
//! This crate provides foundational utilities used across the API and worker
//! processes:
//! - Layered configuration loading
//! - Tracing subscriber setup
//! - Deadline parsing and delay computation
//! - Retry logic with backoff

pub mod config;
pub mod datetime;
pub mod retry;
pub mod telemetry;

// Re-export commonly used types
pub use config::{AppConfig, DatabaseConfig, RedisConfig, ServerConfig, TelemetryConfig};
pub use datetime::{delay_until, parse_deadline, DeadlineParseError};
pub use retry::{retry_with_backoff, retry_with_predicate, ExponentialBackoff, RetryPolicy};
pub use telemetry::init_tracing;

/// Common error type used throughout the crate
pub type Result<T> = std::result::Result<T, anyhow::Error>;
