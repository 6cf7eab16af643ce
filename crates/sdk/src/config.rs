//! SDK configuration

use crate::error::{SdkError, SdkResult};
use std::time::Duration;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the scheduler API
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: crate::DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(10),
            user_agent: format!("tourney-sdk/{}", crate::VERSION),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    ///
    /// - `TOURNEY_SCHEDULER_URL`: Base URL of the scheduler API
    /// - `TOURNEY_SCHEDULER_TIMEOUT`: Request timeout in seconds
    pub fn from_env() -> SdkResult<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("TOURNEY_SCHEDULER_URL") {
            config.base_url = url;
        }

        if let Ok(timeout) = std::env::var("TOURNEY_SCHEDULER_TIMEOUT") {
            let secs: u64 = timeout.parse().map_err(|_| SdkError::Config {
                message: format!("Invalid timeout value: {}", timeout),
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Set the base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> SdkResult<()> {
        if self.base_url.is_empty() {
            return Err(SdkError::Config {
                message: "Base URL cannot be empty".to_string(),
            });
        }

        url::Url::parse(&self.base_url).map_err(|e| SdkError::Config {
            message: format!("Invalid base URL: {}", e),
        })?;

        Ok(())
    }
}
