//! Shared data models for textq.
//!
//! This crate provides Serde-serializable types for:
//! - Job identifiers and queue payloads
//! - The job status state machine
//! - Status query views and dead-letter entries

pub mod job;
pub mod job_status;

pub use job::{DeadLetter, JobId, JobPayload, JobView};
pub use job_status::{JobStatus, ParseStatusError};
