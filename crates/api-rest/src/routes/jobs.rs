//! Operator endpoints for job inspection.

use crate::{error::ApiResult, responses::JobList, state::AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct FailedJobsQuery {
    pub limit: Option<usize>,
}

/// Job routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/jobs/failed", get(failed_jobs))
}

/// Retained terminal failures, most recent first
async fn failed_jobs(
    State(state): State<AppState>,
    Query(query): Query<FailedJobsQuery>,
) -> ApiResult<Json<JobList>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let jobs = state.queue.failed_jobs(limit).await?;
    Ok(Json(jobs.into()))
}
