//! Request and response bodies of the scheduling API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourney_domain::{JobId, TournamentId};

/// Body sent when a tournament is created or edited
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    pub tournament_id: TournamentId,
    pub application_deadline: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_data: Option<serde_json::Value>,
}

/// Confirmation that processing is scheduled
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfirmation {
    pub message: String,
    pub tournament_id: TournamentId,
    pub job_id: JobId,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub replaced_job_id: Option<JobId>,
}

/// Summary of a tournament's outstanding job
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingJob {
    pub id: JobId,
    pub state: String,
    pub attempts: u32,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[allow(dead_code)]
    pub error: Option<String>,
    pub message: String,
}
