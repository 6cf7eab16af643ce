//! Job consumer - claim due jobs and run them through a worker

use super::{AckOutcome, DelayQueue, FailureDisposition, QueueResult};
use crate::metrics::WorkerMetrics;
use crate::workers::{JobOutcome, Worker};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tourney_domain::JobId;
use tracing::{debug, error, info, warn};

/// Pause after a queue error before polling again
const ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Result of one claim-and-execute cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Nothing was due
    Idle,
    /// The job ran and was acknowledged
    Completed { job_id: JobId, outcome: JobOutcome },
    /// The job failed and will be retried
    Retrying { job_id: JobId, due_at: DateTime<Utc> },
    /// The job failed terminally
    Failed { job_id: JobId, reason: String },
    /// The lease was lost before the result could be recorded
    Stale { job_id: JobId },
}

/// Job consumer for claiming and processing jobs
#[derive(Clone)]
pub struct JobConsumer {
    queue: Arc<dyn DelayQueue>,
    worker: Arc<dyn Worker>,
    metrics: WorkerMetrics,
    poll_interval: Duration,
}

impl JobConsumer {
    /// Create a new job consumer
    pub fn new(
        queue: Arc<dyn DelayQueue>,
        worker: Arc<dyn Worker>,
        metrics: WorkerMetrics,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            worker,
            metrics,
            poll_interval,
        }
    }

    /// Claim one due job, run it and record the result
    pub async fn process_next(&self, worker_id: usize) -> QueueResult<CycleOutcome> {
        let Some(job) = self.queue.claim_due().await? else {
            return Ok(CycleOutcome::Idle);
        };

        debug!(
            worker_id,
            worker = self.worker.name(),
            job_id = %job.id,
            tournament_id = %job.tournament_id(),
            attempt = job.attempts,
            "Processing job"
        );

        self.metrics.increment_jobs_processed();
        let start = Instant::now();
        let result = self.worker.process(&job).await;
        let duration = start.elapsed();
        self.metrics.record_job_duration(duration);

        match result {
            Ok(outcome) => {
                if outcome == JobOutcome::AlreadyGenerated {
                    self.metrics.increment_duplicates_skipped();
                }

                match self.queue.mark_completed(&job).await? {
                    AckOutcome::Acknowledged => {
                        self.metrics.increment_jobs_completed();
                        info!(
                            worker_id,
                            job_id = %job.id,
                            duration_ms = duration.as_millis() as u64,
                            "Job completed successfully"
                        );
                        Ok(CycleOutcome::Completed {
                            job_id: job.id,
                            outcome,
                        })
                    }
                    AckOutcome::Stale => {
                        self.metrics.increment_stale_acks();
                        warn!(worker_id, job_id = %job.id, "Job finished after its lease was lost");
                        Ok(CycleOutcome::Stale { job_id: job.id })
                    }
                }
            }
            Err(e) => {
                let reason = e.to_string();
                match self
                    .queue
                    .mark_failed(&job, &reason, e.is_retryable())
                    .await?
                {
                    FailureDisposition::Retrying { due_at } => {
                        self.metrics.increment_jobs_retried();
                        warn!(
                            worker_id,
                            job_id = %job.id,
                            attempt = job.attempts,
                            retry_at = %due_at,
                            error = %e,
                            "Job failed, retrying"
                        );
                        Ok(CycleOutcome::Retrying {
                            job_id: job.id,
                            due_at,
                        })
                    }
                    FailureDisposition::Terminal => {
                        self.metrics.increment_jobs_failed();
                        error!(
                            worker_id,
                            job_id = %job.id,
                            tournament_id = %job.tournament_id(),
                            attempt = job.attempts,
                            error_code = e.error_code(),
                            error = %e,
                            "Job failed permanently"
                        );
                        Ok(CycleOutcome::Failed {
                            job_id: job.id,
                            reason,
                        })
                    }
                    FailureDisposition::Stale => {
                        self.metrics.increment_stale_acks();
                        Ok(CycleOutcome::Stale { job_id: job.id })
                    }
                }
            }
        }
    }

    /// Worker loop - poll for due jobs until shutdown is signalled
    pub async fn worker_loop(&self, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        info!(worker_id, worker = self.worker.name(), "Worker loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let pause = match self.process_next(worker_id).await {
                Ok(CycleOutcome::Idle) => self.poll_interval,
                Ok(_) => continue,
                Err(e) => {
                    error!(worker_id, error = %e, "Failed to poll delay queue");
                    ERROR_BACKOFF
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = shutdown.changed() => {}
            }
        }

        info!(worker_id, "Worker loop stopped");
    }
}
