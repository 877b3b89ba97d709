//! Structured job logging.
//!
//! Every lifecycle line carries the job ID and the transform name so a
//! single job can be followed through the logs of any worker instance.

use tracing::{error, info, info_span, warn, Span};

use textq_models::JobId;

/// Lifecycle logger bound to one job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
    transform: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, transform: &str) -> Self {
        Self {
            job_id: job_id.clone(),
            transform: transform.to_string(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn log_start(&self, detail: &str) {
        info!(job_id = %self.job_id, transform = %self.transform, "Processing job ({})", detail);
    }

    pub fn log_warning(&self, detail: &str) {
        warn!(job_id = %self.job_id, transform = %self.transform, "{}", detail);
    }

    pub fn log_error(&self, detail: &str) {
        error!(job_id = %self.job_id, transform = %self.transform, "Job failed: {}", detail);
    }

    pub fn log_completion(&self, detail: &str) {
        info!(job_id = %self.job_id, transform = %self.transform, "Job done ({})", detail);
    }

    /// Span wrapping all store calls made for this job.
    pub fn create_span(&self) -> Span {
        info_span!("job", job_id = %self.job_id, transform = %self.transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_keeps_job_id() {
        let job_id = JobId::from_string("abc123");
        let logger = JobLogger::new(&job_id, "uppercase");

        assert_eq!(logger.job_id(), &job_id);
    }
}
