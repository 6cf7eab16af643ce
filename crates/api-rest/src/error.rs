//! HTTP error handling and conversion.
//!
//! This module provides error types for the REST API and implements
//! conversion from domain errors to HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tourney_domain::errors::ErrorResponse;
use tourney_domain::AppError;
use tracing::error;

/// API-specific error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error
    #[error(transparent)]
    Domain(#[from] AppError),

    /// Malformed or incomplete request body
    #[error("{0}")]
    BadRequest(String),

    /// Not found
    #[error("{0}")]
    NotFound(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain(err) => StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Get error code for API response
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Domain(err) => err.error_code(),
            Self::BadRequest(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<tourney_worker::queue::QueueError> for ApiError {
    fn from(err: tourney_worker::queue::QueueError) -> Self {
        Self::Domain(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: self.error_code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
