//! Worker implementations

pub mod ladder;

pub use ladder::LadderWorker;

use crate::queue::ScheduledJob;
use async_trait::async_trait;
use tourney_domain::AppResult;

/// What a successful execution did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// A new match batch was written
    LadderGenerated { matches: usize },
    /// Matches already existed; nothing was written
    AlreadyGenerated,
}

/// Worker trait for processing jobs
#[async_trait]
pub trait Worker: Send + Sync {
    /// Process a job
    ///
    /// Errors classified as retryable send the job back for another attempt.
    async fn process(&self, job: &ScheduledJob) -> AppResult<JobOutcome>;

    /// Get the worker name
    fn name(&self) -> &str;
}
