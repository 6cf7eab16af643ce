//! Processing scheduler
//!
//! Entry point used when a tournament is created or edited: computes how long
//! to wait until the application deadline and upserts the processing job for
//! the tournament, so only the latest deadline is ever acted on.

use crate::config::QueueConfig;
use crate::queue::{DelayQueue, JobPayload, QueueError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tourney_common::datetime::{delay_until, parse_deadline};
use tourney_common::retry::{retry_with_predicate, RetryPolicy};
use tourney_domain::{AppError, AppResult, JobId, JobKey, TournamentId};
use tracing::{info, instrument, warn};

/// Confirmation that a processing job is in place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleReceipt {
    pub job_id: JobId,
    pub tournament_id: TournamentId,
    pub due_at: DateTime<Utc>,
    /// Delay computed at scheduling time
    #[serde(skip)]
    pub delay: Duration,
    /// The not-yet-started job this one replaced
    pub replaced: Option<JobId>,
}

/// Schedules tournament processing at the application deadline
#[derive(Clone)]
pub struct ProcessingScheduler {
    queue: Arc<dyn DelayQueue>,
    conflict_retry: RetryPolicy,
}

impl ProcessingScheduler {
    pub fn new(queue: Arc<dyn DelayQueue>, config: &QueueConfig) -> Self {
        Self {
            queue,
            conflict_retry: config.conflict_retry_policy(),
        }
    }

    /// Validate raw request input, then schedule.
    pub async fn schedule_processing(
        &self,
        tournament_id: &str,
        application_deadline: &str,
        processing_data: Option<serde_json::Value>,
    ) -> AppResult<ScheduleReceipt> {
        let tournament_id = TournamentId::parse(tournament_id)
            .map_err(|_| AppError::Validation("tournamentId must not be empty".to_string()))?;
        let deadline = parse_deadline(application_deadline)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.schedule_at(tournament_id, deadline, processing_data).await
    }

    /// Upsert the processing job for `tournament_id` due at `deadline`.
    ///
    /// A deadline in the past makes the job due immediately. If the current
    /// job for the tournament is executing, the upsert is retried a few times
    /// before failing with [`AppError::SchedulingConflict`].
    #[instrument(skip_all, fields(tournament_id = %tournament_id, deadline = %deadline))]
    pub async fn schedule_at(
        &self,
        tournament_id: TournamentId,
        deadline: DateTime<Utc>,
        processing_data: Option<serde_json::Value>,
    ) -> AppResult<ScheduleReceipt> {
        let key = JobKey::for_tournament(&tournament_id);
        let payload = JobPayload {
            tournament_id: tournament_id.clone(),
            application_deadline: deadline,
            processing_data,
        };

        let now = Utc::now();
        if deadline <= now {
            warn!(
                tournament_id = %tournament_id,
                deadline = %deadline,
                "Application deadline already passed, processing immediately"
            );
        }

        let queue = &self.queue;
        let key_ref = &key;
        let result = retry_with_predicate(
            self.conflict_retry.clone(),
            move || {
                let payload = payload.clone();
                let delay = delay_until(deadline, Utc::now());
                async move {
                    queue
                        .upsert(key_ref, payload, delay)
                        .await
                        .map(|outcome| (outcome, delay))
                }
            },
            |err| matches!(err, QueueError::ActiveConflict { .. }),
        )
        .await;

        let (outcome, delay) = match result {
            Ok(value) => value,
            Err(QueueError::ActiveConflict { job_id, .. }) => {
                warn!(
                    tournament_id = %tournament_id,
                    active_job = %job_id,
                    "Processing job is running, schedule rejected"
                );
                return Err(AppError::SchedulingConflict {
                    key: key.to_string(),
                    attempts: self.conflict_retry.max_retries + 1,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match outcome.replaced {
            Some(replaced) => info!(
                tournament_id = %tournament_id,
                job_id = %outcome.job_id,
                replaced = %replaced,
                due_at = %outcome.due_at,
                "Processing job rescheduled"
            ),
            None => info!(
                tournament_id = %tournament_id,
                job_id = %outcome.job_id,
                due_at = %outcome.due_at,
                "Processing job scheduled"
            ),
        }

        Ok(ScheduleReceipt {
            job_id: outcome.job_id,
            tournament_id,
            due_at: outcome.due_at,
            delay,
            replaced: outcome.replaced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryDelayQueue;
    use chrono::Duration as ChronoDuration;

    fn scheduler() -> (ProcessingScheduler, Arc<InMemoryDelayQueue>) {
        let queue = Arc::new(InMemoryDelayQueue::default());
        let config = QueueConfig {
            conflict_retry_delay_ms: 1,
            ..Default::default()
        };
        (ProcessingScheduler::new(queue.clone(), &config), queue)
    }

    #[tokio::test]
    async fn test_delay_matches_deadline() {
        let (scheduler, _) = scheduler();
        let deadline = Utc::now() + ChronoDuration::hours(2);

        let receipt = scheduler
            .schedule_at(TournamentId::parse("t1").unwrap(), deadline, None)
            .await
            .unwrap();

        assert!(receipt.delay <= Duration::from_secs(2 * 3600));
        assert!(receipt.delay > Duration::from_secs(2 * 3600 - 5));
        assert!(receipt.replaced.is_none());
    }

    #[tokio::test]
    async fn test_past_deadline_has_zero_delay() {
        let (scheduler, queue) = scheduler();
        let deadline = Utc::now() - ChronoDuration::days(1);

        let receipt = scheduler
            .schedule_at(TournamentId::parse("t1").unwrap(), deadline, None)
            .await
            .unwrap();

        assert_eq!(receipt.delay, Duration::ZERO);
        assert!(queue.claim_due().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_input_is_validation_error() {
        let (scheduler, _) = scheduler();

        let err = scheduler
            .schedule_processing("", "2030-01-01T00:00:00Z", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = scheduler
            .schedule_processing("t1", "next tuesday", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_processing_data_is_carried() {
        let (scheduler, queue) = scheduler();

        scheduler
            .schedule_processing(
                "t1",
                "2000-01-01 10:00:00",
                Some(serde_json::json!({ "edited": true })),
            )
            .await
            .unwrap();

        let job = queue.claim_due().await.unwrap().unwrap();
        assert_eq!(
            job.payload.processing_data,
            Some(serde_json::json!({ "edited": true }))
        );
    }

    #[tokio::test]
    async fn test_active_job_yields_conflict() {
        let (scheduler, queue) = scheduler();
        let id = TournamentId::parse("t1").unwrap();

        scheduler.schedule_at(id.clone(), Utc::now(), None).await.unwrap();
        queue.claim_due().await.unwrap().unwrap();

        let err = scheduler
            .schedule_at(id, Utc::now() + ChronoDuration::hours(1), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::SchedulingConflict { attempts: 3, .. }
        ));
        assert_eq!(err.http_status(), 409);
    }
}
