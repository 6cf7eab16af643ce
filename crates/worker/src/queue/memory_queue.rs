//! In-process delay queue
//!
//! A min-heap of due times plus a key index, guarded by one mutex. Replaced
//! jobs are removed from the job map and their heap entries are skipped lazily
//! when they surface. Used by tests and single-process deployments.

use super::job::{JobPayload, JobState, ScheduledJob};
use super::{AckOutcome, DelayQueue, FailureDisposition, QueueError, QueueResult, UpsertOutcome};
use crate::config::{QueueConfig, RetryConfig};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::time::Duration;
use tourney_domain::{JobId, JobKey};
use tracing::{debug, warn};

/// Delay queue held in memory
pub struct InMemoryDelayQueue {
    queue: QueueConfig,
    retry: RetryConfig,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    jobs: HashMap<JobId, ScheduledJob>,
    keys: HashMap<JobKey, JobId>,
    due: BinaryHeap<Reverse<(DateTime<Utc>, JobId)>>,
    completed: VecDeque<ScheduledJob>,
    failed: VecDeque<ScheduledJob>,
}

/// Heap entries tolerated beyond one per live job before stale ones are purged
const STALE_ENTRY_SLACK: usize = 64;

impl State {
    fn schedule(&mut self, job: ScheduledJob) {
        self.due.push(Reverse((job.due_at, job.id)));
        self.jobs.insert(job.id, job);

        if self.due.len() > 2 * self.jobs.len() + STALE_ENTRY_SLACK {
            self.compact();
        }
    }

    /// Drop heap entries for jobs that were replaced, rescheduled or finished
    fn compact(&mut self) {
        let jobs = &self.jobs;
        let before = self.due.len();
        self.due.retain(|Reverse((due_at, id))| {
            jobs.get(id)
                .is_some_and(|job| job.state == JobState::Delayed && job.due_at == *due_at)
        });
        debug!(removed = before - self.due.len(), "Compacted due heap");
    }

    /// Drop the key index entry if it still points at `job`
    fn release_key(&mut self, job: &ScheduledJob) {
        if self.keys.get(&job.key) == Some(&job.id) {
            self.keys.remove(&job.key);
        }
    }

    /// Take an active job whose lease matches the caller's attempt
    fn take_leased(&mut self, claimed: &ScheduledJob) -> Option<ScheduledJob> {
        let current = self.jobs.get(&claimed.id)?;
        if current.state != JobState::Active || current.attempts != claimed.attempts {
            return None;
        }
        self.jobs.remove(&claimed.id)
    }

    fn retain(list: &mut VecDeque<ScheduledJob>, job: ScheduledJob, keep: usize) {
        if keep == 0 {
            return;
        }
        list.push_front(job);
        list.truncate(keep);
    }

    fn fail_terminally(&mut self, mut job: ScheduledJob, reason: &str, now: DateTime<Utc>, keep: usize) {
        job.state = JobState::Failed;
        job.lease_until = None;
        job.last_error = Some(reason.to_string());
        job.updated_at = now;
        self.release_key(&job);
        Self::retain(&mut self.failed, job, keep);
    }

    /// Return jobs whose lease ran out to the delayed state, or fail them if
    /// they have no attempts left.
    fn reclaim_expired(&mut self, now: DateTime<Utc>, keep_failed: usize) {
        let expired: Vec<JobId> = self
            .jobs
            .values()
            .filter(|job| job.state == JobState::Active)
            .filter(|job| job.lease_until.map_or(true, |until| until <= now))
            .map(|job| job.id)
            .collect();

        for id in expired {
            let Some(mut job) = self.jobs.remove(&id) else {
                continue;
            };

            if job.should_retry() {
                warn!(job_id = %job.id, attempts = job.attempts, "Lease expired, redelivering job");
                job.state = JobState::Delayed;
                job.lease_until = None;
                job.due_at = now;
                job.updated_at = now;
                self.schedule(job);
            } else {
                warn!(job_id = %job.id, attempts = job.attempts, "Lease expired on final attempt");
                self.fail_terminally(job, "lease expired after final attempt", now, keep_failed);
            }
        }
    }
}

impl InMemoryDelayQueue {
    /// Create an empty queue
    pub fn new(queue: QueueConfig, retry: RetryConfig) -> Self {
        Self {
            queue,
            retry,
            state: Mutex::new(State::default()),
        }
    }

    /// Number of delayed or active jobs
    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retained completed jobs, most recent first
    pub fn completed_jobs(&self) -> Vec<ScheduledJob> {
        self.state.lock().completed.iter().cloned().collect()
    }
}

impl Default for InMemoryDelayQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default(), RetryConfig::default())
    }
}

#[async_trait]
impl DelayQueue for InMemoryDelayQueue {
    async fn upsert(
        &self,
        key: &JobKey,
        payload: JobPayload,
        delay: Duration,
    ) -> QueueResult<UpsertOutcome> {
        let now = Utc::now();
        let due_at = now + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
        let mut state = self.state.lock();

        let replaced = match state.keys.get(key).copied() {
            Some(existing) => match state.jobs.get(&existing) {
                Some(job) if job.state == JobState::Active => {
                    return Err(QueueError::ActiveConflict {
                        key: key.clone(),
                        job_id: existing,
                    });
                }
                Some(_) => {
                    state.jobs.remove(&existing);
                    Some(existing)
                }
                None => None,
            },
            None => None,
        };

        let job = ScheduledJob::new(key.clone(), payload, due_at, self.retry.max_attempts);
        let job_id = job.id;
        state.keys.insert(key.clone(), job_id);
        state.schedule(job);

        debug!(key = %key, job_id = %job_id, replaced = ?replaced, "Job upserted");

        Ok(UpsertOutcome {
            job_id,
            due_at,
            replaced,
        })
    }

    async fn claim_due(&self) -> QueueResult<Option<ScheduledJob>> {
        let now = Utc::now();
        let mut state = self.state.lock();
        state.reclaim_expired(now, self.queue.keep_failed);

        while let Some(Reverse((due_at, id))) = state.due.peek().copied() {
            if due_at > now {
                break;
            }
            state.due.pop();

            let lease_until = now + self.queue.lease_timeout();

            // Skip heap entries left behind by replaced or rescheduled jobs
            let Some(job) = state.jobs.get_mut(&id) else {
                continue;
            };
            if job.state != JobState::Delayed || job.due_at != due_at {
                continue;
            }

            job.state = JobState::Active;
            job.attempts += 1;
            job.lease_until = Some(lease_until);
            job.updated_at = now;
            return Ok(Some(job.clone()));
        }

        Ok(None)
    }

    async fn mark_completed(&self, job: &ScheduledJob) -> QueueResult<AckOutcome> {
        let now = Utc::now();
        let mut state = self.state.lock();

        let Some(mut current) = state.take_leased(job) else {
            return Ok(AckOutcome::Stale);
        };

        current.state = JobState::Completed;
        current.lease_until = None;
        current.updated_at = now;
        state.release_key(&current);
        State::retain(&mut state.completed, current, self.queue.keep_completed);

        Ok(AckOutcome::Acknowledged)
    }

    async fn mark_failed(
        &self,
        job: &ScheduledJob,
        reason: &str,
        retryable: bool,
    ) -> QueueResult<FailureDisposition> {
        let now = Utc::now();
        let mut state = self.state.lock();

        let Some(mut current) = state.take_leased(job) else {
            return Ok(FailureDisposition::Stale);
        };

        if retryable && current.should_retry() {
            let backoff = self.retry.calculate_backoff(current.attempts);
            let due_at = now + chrono::Duration::from_std(backoff).unwrap_or(chrono::Duration::zero());
            current.state = JobState::Delayed;
            current.lease_until = None;
            current.due_at = due_at;
            current.last_error = Some(reason.to_string());
            current.updated_at = now;
            state.schedule(current);
            return Ok(FailureDisposition::Retrying { due_at });
        }

        state.fail_terminally(current, reason, now, self.queue.keep_failed);
        Ok(FailureDisposition::Terminal)
    }

    async fn pending(&self, key: &JobKey) -> QueueResult<Option<ScheduledJob>> {
        let state = self.state.lock();
        Ok(state
            .keys
            .get(key)
            .and_then(|id| state.jobs.get(id))
            .cloned())
    }

    async fn failed_jobs(&self, limit: usize) -> QueueResult<Vec<ScheduledJob>> {
        Ok(self.state.lock().failed.iter().take(limit).cloned().collect())
    }

    async fn health_check(&self) -> QueueResult<()> {
        Ok(())
    }
}
