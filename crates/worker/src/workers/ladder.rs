//! Ladder generation worker
//!
//! Executes a due tournament processing job: reads the roster ordered by
//! ranking, generates the single-elimination ladder and writes the match batch
//! unless one already exists. Re-running a job for a tournament that already
//! has matches is a no-op, which makes redelivery after a lost lease safe.

use super::{JobOutcome, Worker};
use crate::queue::ScheduledJob;
use async_trait::async_trait;
use std::sync::Arc;
use tourney_domain::{generate_ladder, AppError, AppResult, InsertOutcome, PreconditionError};
use tourney_infrastructure::{Error as StoreError, TournamentRepository};
use tracing::{debug, info, instrument};

/// Worker that turns a tournament roster into matches
pub struct LadderWorker {
    repository: Arc<dyn TournamentRepository>,
}

impl LadderWorker {
    pub fn new(repository: Arc<dyn TournamentRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Worker for LadderWorker {
    #[instrument(skip(self, job), fields(job_id = %job.id, tournament_id = %job.tournament_id()))]
    async fn process(&self, job: &ScheduledJob) -> AppResult<JobOutcome> {
        let tournament_id = job.tournament_id();

        let roster = self
            .repository
            .fetch_participants_ordered_by_ranking(tournament_id)
            .await?
            .ok_or_else(|| PreconditionError::TournamentNotFound(tournament_id.clone()))?;

        debug!(
            tournament_id = %tournament_id,
            participants = roster.participants.len(),
            "Generating ladder"
        );

        let matches = generate_ladder(&roster.tournament_id, roster.starts_at, &roster.participants)?;

        let outcome = self
            .repository
            .insert_match_batch_if_absent(tournament_id, &matches)
            .await
            .map_err(|e| match e {
                // The tournament was deleted between the read and the write
                StoreError::NotFound(_) => {
                    PreconditionError::TournamentNotFound(tournament_id.clone()).into()
                }
                other => AppError::from(other),
            })?;

        match outcome {
            InsertOutcome::Inserted => {
                info!(
                    tournament_id = %tournament_id,
                    job_id = %job.id,
                    matches = matches.len(),
                    "Ladder generated"
                );
                Ok(JobOutcome::LadderGenerated {
                    matches: matches.len(),
                })
            }
            InsertOutcome::AlreadyExists => {
                info!(
                    tournament_id = %tournament_id,
                    job_id = %job.id,
                    "Matches already generated, skipping"
                );
                Ok(JobOutcome::AlreadyGenerated)
            }
        }
    }

    fn name(&self) -> &str {
        "ladder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::JobPayload;
    use chrono::Utc;
    use tourney_domain::{JobKey, PlayerRef};
    use tourney_testing::fixtures::{roster, tournament_id_of};
    use tourney_testing::mocks::MockTournamentRepository;

    fn job_for(tournament: &str) -> ScheduledJob {
        let tournament_id = tournament_id_of(tournament);
        ScheduledJob::new(
            JobKey::for_tournament(&tournament_id),
            JobPayload {
                tournament_id,
                application_deadline: Utc::now(),
                processing_data: None,
            },
            Utc::now(),
            3,
        )
    }

    #[tokio::test]
    async fn test_generates_and_stores_ladder() {
        let repository = MockTournamentRepository::new().with_roster(roster("t1", 5));
        let worker = LadderWorker::new(Arc::new(repository.clone()));

        let outcome = worker.process(&job_for("t1")).await.unwrap();
        assert_eq!(outcome, JobOutcome::LadderGenerated { matches: 4 });

        let stored = repository.matches_for(&tournament_id_of("t1")).unwrap();
        assert_eq!(stored.len(), 4);
        assert_eq!(stored[3].player1, PlayerRef::winner_of(2));
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let repository = MockTournamentRepository::new().with_roster(roster("t1", 4));
        let worker = LadderWorker::new(Arc::new(repository.clone()));

        worker.process(&job_for("t1")).await.unwrap();
        let outcome = worker.process(&job_for("t1")).await.unwrap();

        assert_eq!(outcome, JobOutcome::AlreadyGenerated);
        assert_eq!(repository.matches_for(&tournament_id_of("t1")).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_tournament_is_precondition_failure() {
        let worker = LadderWorker::new(Arc::new(MockTournamentRepository::new()));

        let err = worker.process(&job_for("ghost")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Precondition(PreconditionError::TournamentNotFound(_))
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_too_few_participants_is_not_retryable() {
        let repository = MockTournamentRepository::new().with_roster(roster("t1", 1));
        let worker = LadderWorker::new(Arc::new(repository.clone()));

        let err = worker.process(&job_for("t1")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Precondition(PreconditionError::NotEnoughParticipants { count: 1 })
        ));
        assert!(!err.is_retryable());
        assert_eq!(repository.insert_calls(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_is_retryable() {
        let repository = MockTournamentRepository::new().with_roster(roster("t1", 4));
        repository.fail_next_fetches(1);
        let worker = LadderWorker::new(Arc::new(repository));

        let err = worker.process(&job_for("t1")).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
