//! Application builder.
//!
//! Assembles routes, middleware and state into an Axum router.

use crate::{
    middleware::{logging_middleware, request_id_middleware},
    routes,
    state::AppState,
};
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let timeout = state.config.request_timeout();

    routes::routes().with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(timeout))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(middleware::from_fn(logging_middleware)),
    )
}
