//! SDK error types

use thiserror::Error;

/// Result type alias for SDK operations
pub type SdkResult<T> = Result<T, SdkError>;

/// SDK error type
///
/// Every variant means the tournament edit that triggered the call must be
/// treated as failed.
#[derive(Error, Debug)]
pub enum SdkError {
    /// The request was rejected as malformed (HTTP 400)
    #[error("Validation failed: {message}")]
    Validation {
        /// Error message
        message: String,
    },

    /// The tournament's processing job is running and could not be replaced (HTTP 409)
    #[error("Scheduling conflict: {message}")]
    Conflict {
        /// Error message
        message: String,
    },

    /// The queue store is unavailable (HTTP 503)
    #[error("Scheduler unavailable: {message}")]
    Unavailable {
        /// Error message
        message: String,
    },

    /// Any other non-success status
    #[error("Unexpected response ({status_code}): {message}")]
    Unexpected {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Request timeout
    #[error("Request timed out")]
    Timeout,

    /// Network error
    #[error("Network error: {message}")]
    Network {
        /// Error message
        message: String,
        /// Underlying error
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The response body could not be decoded
    #[error("Invalid API response: {message}")]
    InvalidResponse {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

impl SdkError {
    /// Whether the caller may reasonably try again later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SdkError::Unavailable { .. } | SdkError::Timeout | SdkError::Network { .. }
        )
    }

    /// Get the HTTP status code if available
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SdkError::Validation { .. } => Some(400),
            SdkError::Conflict { .. } => Some(409),
            SdkError::Unavailable { .. } => Some(503),
            SdkError::Unexpected { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// Map a non-success status and its error message
    pub(crate) fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            400 => SdkError::Validation { message },
            409 => SdkError::Conflict { message },
            503 => SdkError::Unavailable { message },
            _ => SdkError::Unexpected {
                status_code,
                message,
            },
        }
    }
}

/// Convert from reqwest errors
impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SdkError::Timeout
        } else if err.is_decode() {
            SdkError::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            SdkError::Network {
                message: err.to_string(),
                source: Some(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            SdkError::from_status(400, "bad".into()),
            SdkError::Validation { .. }
        ));
        assert!(matches!(
            SdkError::from_status(409, "busy".into()),
            SdkError::Conflict { .. }
        ));
        assert!(SdkError::from_status(503, "down".into()).is_retryable());

        let other = SdkError::from_status(500, "boom".into());
        assert_eq!(other.status_code(), Some(500));
        assert!(!other.is_retryable());
    }
}
