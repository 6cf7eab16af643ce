//! Configuration management for the scheduler services.
//!
//! Settings are loaded in layers (later sources override earlier ones):
//! 1. Default values
//! 2. `config/default.toml` (if present)
//! 3. `config/{APP_ENV}.toml` (if present)
//! 4. Environment variables prefixed with `APP_`, using `__` between sections
//!
//! The API and the worker must point at the same Redis instance and key
//! prefix; the worker additionally needs the database section.
//!
//! ## Example Configuration
//!
//! ```toml
//! [server]
//! port = 3001
//!
//! [redis]
//! url = "redis://127.0.0.1:6379"
//!
//! [database]
//! url = "postgres://localhost:5432/tourney"
//!
//! [worker]
//! pool_size = 50
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    /// Only required by processes that read or write tournament data
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

/// Queue store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_db_timeout")]
    pub timeout_seconds: u64,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Service name attached to log output
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Enable JSON logging format
    #[serde(default)]
    pub json_logging: bool,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_request_timeout() -> u64 {
    30
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_db_timeout() -> u64 {
    30
}

fn default_service_name() -> String {
    "tourney-scheduler".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            json_logging: false,
            log_level: default_log_level(),
        }
    }
}

/// Build the layered configuration sources shared by every section.
///
/// Other crates deserialize their own sections (e.g. `worker`) from the
/// returned value so all settings come from the same files and variables.
pub fn layered_sources() -> Result<config::Config> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

    config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
        // Example: APP_REDIS__URL=redis://queue:6379
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")
}

impl AppConfig {
    /// Load configuration from files and environment variables.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tourney_common::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load configuration");
    /// println!("Server will run on {}:{}", config.server.host, config.server.port);
    /// ```
    pub fn load() -> Result<Self> {
        let app_config: AppConfig = layered_sources()?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.server.request_timeout_seconds == 0 {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        if self.redis.url.is_empty() {
            anyhow::bail!("Redis URL is required");
        }

        if let Some(database) = &self.database {
            if database.url.is_empty() {
                anyhow::bail!("Database URL is required");
            }

            if database.pool_size == 0 {
                anyhow::bail!("Database pool size must be greater than 0");
            }

            if database.timeout_seconds == 0 {
                anyhow::bail!("Database timeout must be greater than 0");
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.telemetry.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log level '{}'. Must be one of: {}",
                self.telemetry.log_level,
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// The database section, required by the worker
    pub fn require_database(&self) -> Result<&DatabaseConfig> {
        self.database
            .as_ref()
            .context("Database configuration is required (set APP_DATABASE__URL)")
    }

    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }
}

impl DatabaseConfig {
    /// Configuration for `url` with default pool settings
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            pool_size: default_pool_size(),
            timeout_seconds: default_db_timeout(),
        }
    }

    /// Get the connection timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3001);
        assert!(config.database.is_none());
        assert!(config.require_database().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.server.port = 0;
        assert!(config.validate().is_err());
        config.server.port = 8080;

        config.redis.url = String::new();
        assert!(config.validate().is_err());
        config.redis.url = default_redis_url();

        config.database = Some(DatabaseConfig {
            url: "postgres://localhost/tourney".to_string(),
            pool_size: 0,
            timeout_seconds: 30,
        });
        assert!(config.validate().is_err());

        config.database = None;
        config.telemetry.log_level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sections_deserialize_with_defaults() {
        let source = config::Config::builder()
            .set_override("redis.url", "redis://queue:6380")
            .unwrap()
            .set_override("database.url", "postgres://db/tourney")
            .unwrap()
            .build()
            .unwrap();

        let config: AppConfig = source.try_deserialize().unwrap();
        assert_eq!(config.redis.url, "redis://queue:6380");
        assert_eq!(config.server.port, 3001);

        let database = config.require_database().unwrap();
        assert_eq!(database.pool_size, 10);
        assert_eq!(database.timeout(), Duration::from_secs(30));
    }
}
