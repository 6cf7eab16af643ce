//! Application state shared across all requests.

use crate::config::ApiConfig;
use std::sync::Arc;
use tourney_worker::{DelayQueue, InMemoryDelayQueue, ProcessingScheduler};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// API configuration
    pub config: Arc<ApiConfig>,

    /// Upserts processing jobs
    pub scheduler: ProcessingScheduler,

    /// Read access for operator endpoints
    pub queue: Arc<dyn DelayQueue>,
}

impl AppState {
    /// Create state over an existing queue
    pub fn new(config: ApiConfig, queue: Arc<dyn DelayQueue>) -> Self {
        let scheduler = ProcessingScheduler::new(queue.clone(), &config.queue);
        Self {
            config: Arc::new(config),
            scheduler,
            queue,
        }
    }

    /// State backed by an in-process queue, for development and tests
    pub fn in_memory(config: ApiConfig) -> Self {
        let queue = Arc::new(InMemoryDelayQueue::new(
            config.queue.clone(),
            config.retry.clone(),
        ));
        Self::new(config, queue)
    }
}
