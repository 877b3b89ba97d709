//! Job status state machine.
//!
//! Status values are persisted as plain strings under `job:<id>:status`,
//! so the string form is part of the storage contract.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Job processing status.
///
/// Advances `queued → processing → done | failed` and never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is queued waiting for a worker
    #[default]
    Queued,
    /// A worker has claimed the job and is running the transform
    Processing,
    /// Result is available
    Done,
    /// Processing failed; error detail is stored alongside
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Processing => 1,
            JobStatus::Done | JobStatus::Failed => 2,
        }
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    ///
    /// Re-writing the same non-terminal status is allowed (TTL refresh).
    /// `queued → failed` is allowed for jobs whose processing fails before
    /// the `processing` write lands.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a stored status string is not a known status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}
