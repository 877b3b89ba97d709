//! Text transformation worker.
//!
//! This crate provides:
//! - The worker loop that drains the job queue one job at a time
//! - The pluggable `Transform` applied to each job's text
//! - Failure recording (failed status plus dead-letter entry)
//! - Graceful shutdown between queue polls

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod retry;
pub mod transform;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::{JobOutcome, Worker};
pub use logging::JobLogger;
pub use transform::{Lowercase, Reverse, Transform, TransformError, Uppercase};
