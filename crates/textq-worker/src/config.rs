//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How long one queue pop blocks before the loop re-checks shutdown
    pub poll_timeout: Duration,
    /// Pause after a failed job, so a poison stream cannot spin the loop
    pub error_backoff: Duration,
    /// Deadline for a single transform
    pub job_timeout: Duration,
    /// Artificial per-job latency, kept for parity with the demo deployment
    pub processing_delay: Duration,
    /// Longest pause between retries while the store is unreachable
    pub max_outage_backoff: Duration,
    /// Name of the built-in transform to run
    pub transform: String,
    /// Port for the Prometheus scrape endpoint; disabled when `None`
    pub metrics_port: Option<u16>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_secs(1),
            job_timeout: Duration::from_secs(30),
            processing_delay: Duration::from_millis(500),
            max_outage_backoff: Duration::from_secs(30),
            transform: "uppercase".to_string(),
            metrics_port: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_timeout: Duration::from_secs(
                std::env::var("WORKER_POLL_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            error_backoff: Duration::from_millis(
                std::env::var("WORKER_ERROR_BACKOFF_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1000),
            ),
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            processing_delay: Duration::from_millis(
                std::env::var("WORKER_PROCESSING_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            max_outage_backoff: Duration::from_secs(
                std::env::var("WORKER_MAX_OUTAGE_BACKOFF_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            transform: std::env::var("WORKER_TRANSFORM").unwrap_or_else(|_| "uppercase".to_string()),
            metrics_port: std::env::var("WORKER_METRICS_PORT")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    /// Config for tests: short polls, no artificial latency.
    pub fn fast() -> Self {
        Self {
            poll_timeout: Duration::from_millis(50),
            error_backoff: Duration::from_millis(10),
            job_timeout: Duration::from_secs(5),
            processing_delay: Duration::ZERO,
            max_outage_backoff: Duration::from_millis(100),
            ..Default::default()
        }
    }
}
