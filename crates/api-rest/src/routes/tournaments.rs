//! Tournament scheduling endpoints.
//!
//! Called by the web tier whenever a tournament is created or edited. A
//! `202 Accepted` means the processing job is in place; any other status
//! means the edit must be treated as failed.

use crate::{
    error::{ApiError, ApiResult},
    extractors::ApiJson,
    responses::ScheduleResponse,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tourney_domain::{JobKey, TournamentId};
use tourney_worker::queue::ScheduledJob;

/// Scheduling request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub tournament_id: Option<String>,
    /// ISO 8601 timestamp; a past instant schedules immediate processing
    pub application_deadline: Option<String>,
    #[serde(default)]
    pub processing_data: Option<serde_json::Value>,
}

/// Tournament routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tournament", post(schedule).put(schedule))
        .route("/tournament/:id/job", get(pending_job))
}

async fn schedule(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ScheduleRequest>,
) -> ApiResult<(StatusCode, Json<ScheduleResponse>)> {
    let tournament_id = required(request.tournament_id, "tournamentId")?;
    let deadline = required(request.application_deadline, "applicationDeadline")?;

    let receipt = state
        .scheduler
        .schedule_processing(&tournament_id, &deadline, request.processing_data)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(receipt.into())))
}

/// The delayed or running job for a tournament
async fn pending_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduledJob>> {
    let tournament_id = TournamentId::parse(id)
        .map_err(|_| ApiError::BadRequest("tournament id must not be empty".to_string()))?;

    state
        .queue
        .pending(&JobKey::for_tournament(&tournament_id))
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!("No pending job for tournament {}", tournament_id))
        })
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{} is required", field)))
}
