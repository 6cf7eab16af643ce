//! Worker metrics and monitoring

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Bound on retained job durations
const MAX_DURATIONS: usize = 1000;

/// Worker metrics
#[derive(Clone, Default)]
pub struct WorkerMetrics {
    inner: Arc<RwLock<MetricsInner>>,
}

#[derive(Default)]
struct MetricsInner {
    /// Jobs claimed and handed to a worker
    jobs_processed: u64,
    /// Jobs acknowledged as completed
    jobs_completed: u64,
    /// Failures that went back to the delayed state
    jobs_retried: u64,
    /// Terminal failures
    jobs_failed: u64,
    /// Executions that found matches already generated
    duplicates_skipped: u64,
    /// Acknowledgements rejected because the lease was lost
    stale_acks: u64,
    /// Job durations (for calculating percentiles)
    durations: Vec<Duration>,
}

impl WorkerMetrics {
    /// Create new metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_jobs_processed(&self) {
        self.inner.write().jobs_processed += 1;
    }

    pub fn increment_jobs_completed(&self) {
        self.inner.write().jobs_completed += 1;
    }

    pub fn increment_jobs_retried(&self) {
        self.inner.write().jobs_retried += 1;
    }

    pub fn increment_jobs_failed(&self) {
        self.inner.write().jobs_failed += 1;
    }

    pub fn increment_duplicates_skipped(&self) {
        self.inner.write().duplicates_skipped += 1;
    }

    pub fn increment_stale_acks(&self) {
        self.inner.write().stale_acks += 1;
    }

    /// Record job duration
    pub fn record_job_duration(&self, duration: Duration) {
        let mut inner = self.inner.write();
        inner.durations.push(duration);

        if inner.durations.len() > MAX_DURATIONS {
            inner.durations.drain(0..MAX_DURATIONS / 2);
        }
    }

    pub fn jobs_processed(&self) -> u64 {
        self.inner.read().jobs_processed
    }

    pub fn jobs_completed(&self) -> u64 {
        self.inner.read().jobs_completed
    }

    pub fn jobs_retried(&self) -> u64 {
        self.inner.read().jobs_retried
    }

    pub fn jobs_failed(&self) -> u64 {
        self.inner.read().jobs_failed
    }

    /// Get average job duration
    pub fn average_duration(&self) -> Option<Duration> {
        let inner = self.inner.read();
        if inner.durations.is_empty() {
            return None;
        }

        let total: Duration = inner.durations.iter().sum();
        Some(total / inner.durations.len() as u32)
    }

    /// Get p95 job duration
    pub fn p95_duration(&self) -> Option<Duration> {
        let inner = self.inner.read();
        if inner.durations.is_empty() {
            return None;
        }

        let mut sorted = inner.durations.clone();
        sorted.sort();
        let index = (sorted.len() as f64 * 0.95) as usize;
        Some(sorted[index.min(sorted.len() - 1)])
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let (processed, completed, retried, failed, duplicates, stale) = {
            let inner = self.inner.read();
            (
                inner.jobs_processed,
                inner.jobs_completed,
                inner.jobs_retried,
                inner.jobs_failed,
                inner.duplicates_skipped,
                inner.stale_acks,
            )
        };

        MetricsSnapshot {
            jobs_processed: processed,
            jobs_completed: completed,
            jobs_retried: retried,
            jobs_failed: failed,
            duplicates_skipped: duplicates,
            stale_acks: stale,
            average_duration: self.average_duration(),
            p95_duration: self.p95_duration(),
        }
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub jobs_processed: u64,
    pub jobs_completed: u64,
    pub jobs_retried: u64,
    pub jobs_failed: u64,
    pub duplicates_skipped: u64,
    pub stale_acks: u64,
    pub average_duration: Option<Duration>,
    pub p95_duration: Option<Duration>,
}

impl MetricsSnapshot {
    /// Share of processed jobs that completed (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.jobs_processed == 0 {
            0.0
        } else {
            self.jobs_completed as f64 / self.jobs_processed as f64
        }
    }
}
