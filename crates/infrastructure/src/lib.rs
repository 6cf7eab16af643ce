//! Infrastructure layer for the tourney scheduler
//!
//! This crate provides implementations for:
//! - Database access (PostgreSQL with sqlx)
//! - The tournament-data repository the ladder worker reads from and writes to
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tourney_infrastructure::{DatabasePool, PgTournamentRepository, TournamentRepository};
//!
//! let pool = DatabasePool::new(app_config.require_database()?).await?;
//! pool.ensure_schema().await?;
//!
//! let repository = PgTournamentRepository::new(pool.pool().clone());
//! let roster = repository.fetch_participants_ordered_by_ranking(&tournament_id).await?;
//! ```

pub mod database;
pub mod repositories;

// Re-export commonly used types
pub use database::{DatabasePool, HealthStatus};
pub use repositories::{PgTournamentRepository, TournamentRepository};

use tourney_domain::AppError;

// Re-export result and error types
pub type Result<T> = std::result::Result<T, Error>;

/// Infrastructure-level errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database errors from sqlx
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be mapped onto a domain type
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Resource not found errors
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database(_))
    }

    /// Get HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::InvalidData(_) => 500,
            Error::Database(_) => 503,
        }
    }
}

impl From<Error> for AppError {
    fn from(error: Error) -> Self {
        if error.is_retryable() {
            AppError::TransientStore(error.to_string())
        } else {
            AppError::Internal(error.to_string())
        }
    }
}
