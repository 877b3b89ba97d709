//! Worker loop.
//!
//! Pops one payload at a time, moves the job through
//! `processing → done`, and records `failed` plus a dead-letter entry
//! when anything in between goes wrong. Errors never leave the loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

use textq_models::{DeadLetter, JobPayload};
use textq_queue::{JobQueue, QueueResult};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::metrics;
use crate::retry::{retry_async, FailureTracker, RetryConfig};
use crate::transform::Transform;

/// What happened to one popped payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Result stored, status `done`
    Completed,
    /// Status `failed` (when the id was readable) and dead-lettered
    Failed,
    /// Job had already reached a terminal status; left untouched
    Skipped,
}

/// A single logical worker.
pub struct Worker {
    config: WorkerConfig,
    queue: JobQueue,
    transform: Arc<dyn Transform>,
    shutdown: watch::Sender<bool>,
    worker_name: String,
}

impl Worker {
    /// Create a worker over an injected queue and transform.
    pub fn new(config: WorkerConfig, queue: JobQueue, transform: Arc<dyn Transform>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            queue,
            transform,
            shutdown,
            worker_name: format!("worker-{}", Uuid::new_v4().simple()),
        }
    }

    pub fn name(&self) -> &str {
        &self.worker_name
    }

    /// Signal the loop to stop after the current poll or job.
    ///
    /// Sticky: a signal sent before `run` starts still stops it.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Run until shutdown is signalled.
    ///
    /// The pop itself is never cancelled: dropping an in-flight BLPOP can
    /// lose the payload it was about to return. Shutdown is therefore
    /// observed between polls, at most one `poll_timeout` late.
    pub async fn run(&self) {
        info!(
            "Starting worker '{}' with transform '{}' on queue '{}'",
            self.worker_name,
            self.transform.name(),
            self.queue.config().queue_name
        );

        let shutdown_rx = self.shutdown.subscribe();
        let mut store_failures = FailureTracker::new(3);
        let outage_backoff = RetryConfig::new("queue_pop")
            .with_base_delay(self.config.error_backoff)
            .with_max_delay(self.config.max_outage_backoff);

        loop {
            let stop = *shutdown_rx.borrow();
            if stop {
                break;
            }

            match self.process_next().await {
                Ok(_) => store_failures.record_success(),
                Err(e) => {
                    metrics::record_store_error();
                    if store_failures.record_failure() {
                        error!("Failed to pop from queue: {}", e);
                    }
                    let delay = outage_backoff.delay_for_attempt(store_failures.failure_count() - 1);
                    tokio::time::sleep(delay).await;
                }
            }
        }

        info!("Worker '{}' stopped", self.worker_name);
    }

    /// Wait one poll interval for a payload and handle it.
    ///
    /// Returns `Ok(None)` on poll timeout. Only a failing pop is an error;
    /// everything after the pop is handled internally.
    pub async fn process_next(&self) -> QueueResult<Option<JobOutcome>> {
        let Some(raw) = self.queue.pop(self.config.poll_timeout).await? else {
            return Ok(None);
        };
        Ok(Some(self.handle(raw).await))
    }

    async fn handle(&self, raw: String) -> JobOutcome {
        let payload = match JobQueue::decode(&raw) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Dropping malformed payload: {}", e);
                metrics::record_job_failed("invalid_payload");
                self.dead_letter(DeadLetter::new(None, raw, e.to_string())).await;
                tokio::time::sleep(self.config.error_backoff).await;
                return JobOutcome::Failed;
            }
        };

        let logger = JobLogger::new(&payload.id, self.transform.name());
        let started = Instant::now();

        let result = self
            .process(&payload, &logger)
            .instrument(logger.create_span())
            .await;

        match result {
            Ok(()) => {
                metrics::record_job_completed(self.transform.name(), started.elapsed().as_secs_f64());
                JobOutcome::Completed
            }
            Err(e) if e.is_already_finished() => {
                logger.log_warning(&format!("skipping redelivered job: {}", e));
                metrics::record_job_skipped();
                JobOutcome::Skipped
            }
            Err(e) => {
                logger.log_error(&format!("{:?}", e));
                metrics::record_job_failed(e.reason());
                self.record_failure(&payload, raw, &e).await;
                tokio::time::sleep(self.config.error_backoff).await;
                JobOutcome::Failed
            }
        }
    }

    async fn process(&self, payload: &JobPayload, logger: &JobLogger) -> WorkerResult<()> {
        self.queue.mark_processing(&payload.id).await?;
        logger.log_start(&format!("{} chars", payload.text.chars().count()));

        if !self.config.processing_delay.is_zero() {
            tokio::time::sleep(self.config.processing_delay).await;
        }

        let output = self.run_transform(&payload.text).await?;
        self.queue.complete(&payload.id, &output).await?;

        logger.log_completion(&format!("{} chars", output.chars().count()));
        Ok(())
    }

    /// Run the transform on the blocking pool under the job deadline.
    ///
    /// A transform that overruns keeps its blocking thread until it
    /// returns; its output is discarded.
    async fn run_transform(&self, text: &str) -> WorkerResult<String> {
        let transform = Arc::clone(&self.transform);
        let input = text.to_string();
        let task = tokio::task::spawn_blocking(move || transform.apply(&input));

        match tokio::time::timeout(self.config.job_timeout, task).await {
            Err(_) => Err(WorkerError::Timeout(self.config.job_timeout)),
            Ok(Err(join_err)) => Err(WorkerError::Panicked(join_err.to_string())),
            Ok(Ok(result)) => Ok(result?),
        }
    }

    /// Mark the job failed and dead-letter its payload. Best effort.
    async fn record_failure(&self, payload: &JobPayload, raw: String, err: &WorkerError) {
        let message = err.to_string();
        let retry = RetryConfig::new("mark_failed").with_max_retries(2);

        if let Err(e) = retry_async(&retry, || self.queue.fail(&payload.id, &message)).await {
            error!(job_id = %payload.id, "Failed to mark job failed: {}", e);
        }
        self.dead_letter(DeadLetter::new(Some(payload.id.clone()), raw, message))
            .await;
    }

    async fn dead_letter(&self, entry: DeadLetter) {
        let retry = RetryConfig::new("dead_letter").with_max_retries(2);
        if let Err(e) = retry_async(&retry, || self.queue.dead_letter(&entry)).await {
            error!("Failed to dead-letter payload: {}", e);
        } else {
            debug!("Dead-lettered payload");
        }
    }
}

/// Wait for `handle` to finish, giving up after `grace`.
pub async fn join_with_grace(handle: tokio::task::JoinHandle<()>, grace: Duration) {
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Worker task ended abnormally: {}", e),
        Err(_) => warn!("Worker did not stop within {:?}", grace),
    }
}
