//! Tourney Scheduler REST API
//!
//! Axum HTTP surface the web tier calls after creating or editing a tournament.
//! Each call upserts the tournament's processing job so matches are generated
//! once the application deadline passes.
//!
//! ## Architecture
//!
//! - **app**: Router assembly and middleware stack
//! - **routes**: Scheduling, job inspection and health endpoints
//! - **middleware**: Request ID propagation and request logging
//! - **extractors**: JSON extraction with API error bodies
//! - **responses**: Response bodies
//! - **error**: HTTP error handling and conversion
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tourney_api::{create_app, ApiConfig, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = AppState::in_memory(ApiConfig::default());
//!     let app = create_app(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3001")
//!         .await
//!         .expect("Failed to bind");
//!
//!     axum::serve(listener, app).await.expect("Server error");
//! }
//! ```

#![warn(clippy::all)]

pub mod app;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod responses;
pub mod routes;
pub mod state;

pub use app::create_app;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
