//! Delay queue with upsert-by-key semantics
//!
//! At most one job per [`JobKey`] is delayed or active at any time. Scheduling
//! the same key again replaces a job that has not started yet; a job that is
//! already running cannot be replaced and surfaces [`QueueError::ActiveConflict`].
//! Claimed jobs are leased, and a lease that expires without an acknowledgement
//! makes the job claimable again (at-least-once delivery).

pub mod consumer;
pub mod job;
pub mod memory_queue;
pub mod redis_queue;

pub use consumer::{CycleOutcome, JobConsumer};
pub use job::{JobPayload, JobState, ScheduledJob};
pub use memory_queue::InMemoryDelayQueue;
pub use redis_queue::RedisDelayQueue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tourney_domain::{AppError, JobId, JobKey};

/// Queue-level errors
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue store could not be reached or rejected a command
    #[error("Queue store error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Payload (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The job under this key is executing and cannot be replaced
    #[error("Job {job_id} for {key} is active and cannot be replaced")]
    ActiveConflict { key: JobKey, job_id: JobId },

    /// A stored job record could not be decoded
    #[error("Corrupt job record: {0}")]
    CorruptRecord(String),
}

impl QueueError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Redis(_))
    }
}

impl From<QueueError> for AppError {
    fn from(error: QueueError) -> Self {
        match error {
            QueueError::Redis(e) => AppError::TransientStore(e.to_string()),
            QueueError::ActiveConflict { key, .. } => AppError::SchedulingConflict {
                key: key.to_string(),
                attempts: 1,
            },
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Result of [`DelayQueue::upsert`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// The newly stored job
    pub job_id: JobId,
    /// When the new job becomes claimable
    pub due_at: DateTime<Utc>,
    /// The not-yet-started job that was cancelled, if any
    pub replaced: Option<JobId>,
}

/// Result of acknowledging a completed job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The job was completed and released
    Acknowledged,
    /// The lease was lost (expired and redelivered, or the job was replaced)
    Stale,
}

/// What happened to a job reported as failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Re-entered the delayed state with backoff
    Retrying { due_at: DateTime<Utc> },
    /// Failed terminally and retained for inspection
    Terminal,
    /// The lease was lost; nothing was recorded
    Stale,
}

/// Durable store of delayed jobs
#[async_trait]
pub trait DelayQueue: Send + Sync {
    /// Store a job under `key` due after `delay`, replacing a not-yet-started one.
    ///
    /// Fails with [`QueueError::ActiveConflict`] while the job for `key` is running.
    async fn upsert(
        &self,
        key: &JobKey,
        payload: JobPayload,
        delay: Duration,
    ) -> QueueResult<UpsertOutcome>;

    /// Claim the earliest due job, if any, and lease it to the caller.
    async fn claim_due(&self) -> QueueResult<Option<ScheduledJob>>;

    /// Acknowledge a claimed job as done.
    async fn mark_completed(&self, job: &ScheduledJob) -> QueueResult<AckOutcome>;

    /// Report a claimed job as failed.
    ///
    /// Retryable failures re-enter the delayed state with backoff until the
    /// job's attempts are used up; everything else is terminal.
    async fn mark_failed(
        &self,
        job: &ScheduledJob,
        reason: &str,
        retryable: bool,
    ) -> QueueResult<FailureDisposition>;

    /// The delayed or active job stored under `key`.
    async fn pending(&self, key: &JobKey) -> QueueResult<Option<ScheduledJob>>;

    /// Retained terminal failures, most recent first.
    async fn failed_jobs(&self, limit: usize) -> QueueResult<Vec<ScheduledJob>>;

    /// Check that the backing store is reachable.
    async fn health_check(&self) -> QueueResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_domain::TournamentId;

    #[test]
    fn test_error_classification() {
        let key = JobKey::for_tournament(&TournamentId::parse("t1").unwrap());
        let conflict = QueueError::ActiveConflict {
            key,
            job_id: JobId::new(),
        };
        assert!(!conflict.is_retryable());

        let app: AppError = conflict.into();
        assert_eq!(app.http_status(), 409);

        let io = redis::RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        let app: AppError = QueueError::from(io).into();
        assert!(app.is_retryable());
        assert_eq!(app.http_status(), 503);
    }
}
