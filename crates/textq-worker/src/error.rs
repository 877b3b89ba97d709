//! Worker error types.

use std::time::Duration;

use thiserror::Error;

use crate::transform::TransformError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Transform exceeded deadline of {0:?}")]
    Timeout(Duration),

    #[error("Transform panicked: {0}")]
    Panicked(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Queue error: {0}")]
    Queue(#[from] textq_queue::QueueError),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            WorkerError::Transform(_) => "transform",
            WorkerError::Timeout(_) => "timeout",
            WorkerError::Panicked(_) => "panic",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Queue(textq_queue::QueueError::InvalidPayload(_)) => "invalid_payload",
            WorkerError::Queue(_) => "store",
        }
    }

    /// Whether the job was already finished by someone else.
    ///
    /// Such a delivery is skipped rather than recorded as a failure.
    pub fn is_already_finished(&self) -> bool {
        matches!(
            self,
            WorkerError::Queue(textq_queue::QueueError::IllegalTransition { .. })
        )
    }
}
