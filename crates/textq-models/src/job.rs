//! Job definitions shared by the API and the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::JobStatus;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID (32 lowercase hex characters).
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key holding the job status.
    pub fn status_key(&self) -> String {
        format!("job:{}:status", self.0)
    }

    /// Store key holding the job result.
    pub fn result_key(&self) -> String {
        format!("job:{}:result", self.0)
    }

    /// Store key holding the failure detail of a failed job.
    pub fn error_key(&self) -> String {
        format!("job:{}:error", self.0)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payload pushed onto the job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub id: JobId,
    pub text: String,
}

impl JobPayload {
    /// Create a payload with a freshly generated ID.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            text: text.into(),
        }
    }
}

/// What a status query reports for a live job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Present once the job is `done`
    pub result: Option<String>,
    /// Present once the job is `failed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Entry pushed onto the dead-letter list when processing fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    /// Missing when the payload could not be parsed
    pub job_id: Option<JobId>,
    /// Raw queue payload as it was popped
    pub payload: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(job_id: Option<JobId>, payload: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_id,
            payload: payload.into(),
            error: error.into(),
            failed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_is_hex() {
        let id = JobId::new();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, JobId::new());
    }

    #[test]
    fn test_key_layout() {
        let id = JobId::from_string("abc");
        assert_eq!(id.status_key(), "job:abc:status");
        assert_eq!(id.result_key(), "job:abc:result");
        assert_eq!(id.error_key(), "job:abc:error");
    }

    #[test]
    fn test_payload_wire_format() {
        let payload = JobPayload {
            id: JobId::from_string("abc"),
            text: "hello".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"id":"abc","text":"hello"}"#);
    }

    #[test]
    fn test_view_omits_absent_error() {
        let view = JobView {
            job_id: JobId::from_string("abc"),
            status: JobStatus::Queued,
            result: None,
            error: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"job_id": "abc", "status": "queued", "result": null})
        );
    }
}
