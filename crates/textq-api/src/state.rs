//! Application state.

use textq_queue::{JobQueue, QueueResult};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub queue: JobQueue,
}

impl AppState {
    /// Create state over an already constructed queue.
    pub fn new(config: ApiConfig, queue: JobQueue) -> Self {
        Self { config, queue }
    }

    /// Create state backed by Redis as configured in the environment.
    ///
    /// Does not connect; an unreachable store shows up in health checks.
    pub fn from_env(config: ApiConfig) -> QueueResult<Self> {
        let queue = JobQueue::from_env()?;
        Ok(Self::new(config, queue))
    }
}
