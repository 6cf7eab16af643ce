//! HTTP route handlers.

pub mod health;
pub mod jobs;
pub mod tournaments;

use crate::state::AppState;
use axum::Router;

/// All API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/api", tournaments::routes().merge(jobs::routes()))
}
