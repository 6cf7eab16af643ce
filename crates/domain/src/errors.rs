//! Error types for tournament scheduling and ladder generation.
//!
//! Every failure a job handler or the scheduler can produce is classified here,
//! so the worker can decide between a retry and a terminal failure, and the HTTP
//! surface can pick a status code without inspecting error messages.

use crate::identifiers::TournamentId;
use serde::{Deserialize, Serialize};

/// Top-level application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The tournament cannot be processed in its current shape; never retried
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// A backing store (queue or database) was unavailable
    #[error("Transient store error: {0}")]
    TransientStore(String),

    /// The job for this key is executing and could not be replaced
    #[error("Scheduling conflict for {key}: job still active after {attempts} attempts")]
    SchedulingConflict {
        /// Queue key of the conflicting job
        key: String,
        /// Number of replace attempts made
        attempts: u32,
    },

    /// Malformed input from the caller
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "PRECONDITION_FAILED",
            Self::TransientStore(_) => "STORE_UNAVAILABLE",
            Self::SchedulingConflict { .. } => "SCHEDULING_CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the HTTP status code for this error
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::SchedulingConflict { .. } => 409,
            Self::Precondition(_) => 422,
            Self::TransientStore(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Check if this error is retryable
    ///
    /// Only store unavailability is worth retrying; a precondition failure will
    /// fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }
}

/// Reasons a tournament's ladder cannot be generated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionError {
    /// Fewer than two participants registered
    #[error("Not enough participants: need at least 2, got {count}")]
    NotEnoughParticipants {
        /// Number of participants found
        count: usize,
    },

    /// Two participants share a ranking, so seeding is ambiguous
    #[error("Duplicate ranking {ranking}: rankings must be unique")]
    DuplicateRanking {
        /// The repeated ranking
        ranking: i32,
    },

    /// The tournament no longer exists
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),
}

/// Error body returned to HTTP callers: `{ "error": ..., "message": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            error: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Application-wide result type
pub type AppResult<T> = Result<T, AppError>;
