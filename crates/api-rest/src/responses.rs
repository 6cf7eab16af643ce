//! Response bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tourney_domain::{JobId, TournamentId};
use tourney_worker::queue::ScheduledJob;
use tourney_worker::ScheduleReceipt;

/// Body returned once processing is scheduled
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResponse {
    pub message: String,
    pub tournament_id: TournamentId,
    pub job_id: JobId,
    pub due_at: DateTime<Utc>,
    pub replaced_job_id: Option<JobId>,
}

impl From<ScheduleReceipt> for ScheduleResponse {
    fn from(receipt: ScheduleReceipt) -> Self {
        let message = match receipt.replaced {
            Some(_) => "Tournament processing rescheduled",
            None => "Tournament processing scheduled",
        };

        Self {
            message: message.to_string(),
            tournament_id: receipt.tournament_id,
            job_id: receipt.job_id,
            due_at: receipt.due_at,
            replaced_job_id: receipt.replaced,
        }
    }
}

/// List of jobs
#[derive(Debug, Serialize)]
pub struct JobList {
    pub count: usize,
    pub jobs: Vec<ScheduledJob>,
}

impl From<Vec<ScheduledJob>> for JobList {
    fn from(jobs: Vec<ScheduledJob>) -> Self {
        Self {
            count: jobs.len(),
            jobs,
        }
    }
}
