//! Job lifecycle on top of a `JobStore`.
//!
//! Persisted layout:
//! - `job:<id>:status` status string, expiring
//! - `job:<id>:result` result text, expiring
//! - `job:<id>:error`  failure detail, expiring (failed jobs only)
//! - `<queue_name>`    FIFO list of pending `JobPayload` JSON
//! - `<dlq_name>`      FIFO list of `DeadLetter` JSON

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use textq_models::{DeadLetter, JobId, JobPayload, JobStatus, JobView};

use crate::error::{QueueError, QueueResult};
use crate::redis_store::RedisStore;
use crate::store::JobStore;

/// Lifetime of every job record, refreshed on each write.
pub const DEFAULT_JOB_TTL_SECS: u64 = 3600;

/// Dead-letter entries kept before the oldest are trimmed.
pub const DEFAULT_DLQ_MAX_LEN: u64 = 10_000;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// List holding pending job payloads
    pub queue_name: String,
    /// List holding failed job payloads
    pub dlq_name: String,
    /// Cap on the dead-letter list; oldest entries are dropped first
    pub dlq_max_len: u64,
    /// Time-to-live of status/result/error records
    pub job_ttl: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379/0".to_string(),
            queue_name: "jobs".to_string(),
            dlq_name: "jobs:dead".to_string(),
            dlq_max_len: DEFAULT_DLQ_MAX_LEN,
            job_ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    ///
    /// `REDIS_URL` wins when set; otherwise the URL is assembled from
    /// `REDIS_HOST`, `REDIS_PORT` and `REDIS_DB`.
    pub fn from_env() -> Self {
        let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| {
            let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "localhost".to_string());
            let port: u16 = std::env::var("REDIS_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(6379);
            let db: u32 = std::env::var("REDIS_DB")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            redis_url(&host, port, db)
        });

        Self {
            redis_url,
            queue_name: std::env::var("QUEUE_NAME").unwrap_or_else(|_| "jobs".to_string()),
            dlq_name: std::env::var("QUEUE_DLQ_NAME").unwrap_or_else(|_| "jobs:dead".to_string()),
            dlq_max_len: std::env::var("QUEUE_DLQ_MAX_LEN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_DLQ_MAX_LEN),
            job_ttl: Duration::from_secs(
                std::env::var("JOB_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_JOB_TTL_SECS),
            ),
        }
    }

    /// Override the record TTL.
    pub fn with_job_ttl(mut self, ttl: Duration) -> Self {
        self.job_ttl = ttl;
        self
    }
}

fn redis_url(host: &str, port: u16, db: u32) -> String {
    format!("redis://{}:{}/{}", host, port, db)
}

/// Job queue client shared by the submission, worker and query paths.
#[derive(Clone)]
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    config: QueueConfig,
}

impl JobQueue {
    /// Create a job queue over an injected store.
    pub fn new(store: Arc<dyn JobStore>, config: QueueConfig) -> Self {
        Self { store, config }
    }

    /// Create a Redis-backed queue from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        let config = QueueConfig::from_env();
        let store = RedisStore::new(&config.redis_url)?;
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Submit a job: write `queued` status, then push the payload.
    ///
    /// The two writes are not transactional. If the push fails the
    /// status record is left behind and simply expires.
    pub async fn submit(&self, text: impl Into<String>) -> QueueResult<JobId> {
        let payload = JobPayload::new(text);
        let encoded = serde_json::to_string(&payload)?;

        self.store
            .set_ex(&payload.id.status_key(), JobStatus::Queued.as_str(), self.config.job_ttl)
            .await?;
        self.store.push(&self.config.queue_name, &encoded).await?;

        info!(job_id = %payload.id, "Enqueued job");
        Ok(payload.id)
    }

    /// Look up a job. `None` when the status record is absent or expired.
    pub async fn query(&self, job_id: &JobId) -> QueueResult<Option<JobView>> {
        let Some(status) = self.status(job_id).await? else {
            debug!(job_id = %job_id, "Job not found");
            return Ok(None);
        };

        let result = self.store.get(&job_id.result_key()).await?;
        let error = match status {
            JobStatus::Failed => self.store.get(&job_id.error_key()).await?,
            _ => None,
        };

        Ok(Some(JobView {
            job_id: job_id.clone(),
            status,
            result,
            error,
        }))
    }

    /// Current status of a job, if its record is live.
    pub async fn status(&self, job_id: &JobId) -> QueueResult<Option<JobStatus>> {
        match self.store.get(&job_id.status_key()).await? {
            Some(raw) => raw
                .parse::<JobStatus>()
                .map(Some)
                .map_err(|_| QueueError::InvalidStatus {
                    job_id: job_id.clone(),
                    status: raw,
                }),
            None => Ok(None),
        }
    }

    /// Wait up to `timeout` for the next raw payload.
    pub async fn pop(&self, timeout: Duration) -> QueueResult<Option<String>> {
        self.store.pop_blocking(&self.config.queue_name, timeout).await
    }

    /// Decode a raw queue payload.
    pub fn decode(raw: &str) -> QueueResult<JobPayload> {
        serde_json::from_str(raw).map_err(|e| QueueError::invalid_payload(e.to_string()))
    }

    /// Move a popped job to `processing`.
    ///
    /// Fails with `IllegalTransition` when the job already reached a
    /// terminal status (for example a payload delivered twice).
    pub async fn mark_processing(&self, job_id: &JobId) -> QueueResult<()> {
        self.ensure_transition(job_id, JobStatus::Processing).await?;
        self.store
            .set_ex(&job_id.status_key(), JobStatus::Processing.as_str(), self.config.job_ttl)
            .await
    }

    /// Store the result and move to `done` in one atomic write.
    pub async fn complete(&self, job_id: &JobId, result: &str) -> QueueResult<()> {
        let entries = [
            (job_id.result_key(), result.to_string()),
            (job_id.status_key(), JobStatus::Done.as_str().to_string()),
        ];
        self.store.set_many_ex(&entries, self.config.job_ttl).await
    }

    /// Store the error detail and move to `failed` in one atomic write.
    ///
    /// Leaves jobs that already reached a terminal status untouched.
    pub async fn fail(&self, job_id: &JobId, error: &str) -> QueueResult<()> {
        match self.ensure_transition(job_id, JobStatus::Failed).await {
            Ok(()) => {}
            Err(e @ QueueError::IllegalTransition { .. }) => {
                warn!(job_id = %job_id, "Not marking job failed: {}", e);
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        let entries = [
            (job_id.error_key(), error.to_string()),
            (job_id.status_key(), JobStatus::Failed.as_str().to_string()),
        ];
        self.store.set_many_ex(&entries, self.config.job_ttl).await
    }

    async fn ensure_transition(&self, job_id: &JobId, next: JobStatus) -> QueueResult<()> {
        match self.status(job_id).await? {
            Some(current) if !current.can_transition_to(next) => Err(QueueError::IllegalTransition {
                job_id: job_id.clone(),
                from: current,
                to: next,
            }),
            _ => Ok(()),
        }
    }

    /// Append an entry to the dead-letter list, trimming it to
    /// `dlq_max_len`.
    pub async fn dead_letter(&self, entry: &DeadLetter) -> QueueResult<()> {
        let encoded = serde_json::to_string(entry)?;
        self.store
            .push_capped(&self.config.dlq_name, &encoded, self.config.dlq_max_len)
            .await?;
        warn!(
            job_id = ?entry.job_id.as_ref().map(JobId::as_str),
            "Moved job to DLQ: {}", entry.error
        );
        Ok(())
    }

    /// Move up to `limit` dead-lettered jobs back onto the queue.
    ///
    /// Each requeued job is reset to `queued` and its error record is
    /// cleared. Entries without a readable job payload (malformed input)
    /// are put back at the tail of the dead-letter list. Returns how many
    /// jobs were requeued.
    pub async fn requeue_dead(&self, limit: usize) -> QueueResult<usize> {
        let pending = self.dlq_len().await?;
        let mut requeued = 0;

        for _ in 0..pending.min(limit as u64) {
            let Some(raw) = self.store.pop(&self.config.dlq_name).await? else {
                break;
            };

            let payload = serde_json::from_str::<DeadLetter>(&raw)
                .ok()
                .and_then(|entry| Self::decode(&entry.payload).ok());

            let Some(payload) = payload else {
                debug!("Keeping unrecoverable dead letter");
                self.store
                    .push_capped(&self.config.dlq_name, &raw, self.config.dlq_max_len)
                    .await?;
                continue;
            };

            self.store.delete(&payload.id.error_key()).await?;
            self.store
                .set_ex(&payload.id.status_key(), JobStatus::Queued.as_str(), self.config.job_ttl)
                .await?;
            let encoded = serde_json::to_string(&payload)?;
            self.store.push(&self.config.queue_name, &encoded).await?;

            info!(job_id = %payload.id, "Requeued dead-lettered job");
            requeued += 1;
        }

        Ok(requeued)
    }

    /// Number of pending payloads.
    pub async fn len(&self) -> QueueResult<u64> {
        self.store.list_len(&self.config.queue_name).await
    }

    /// Number of dead-lettered payloads.
    pub async fn dlq_len(&self) -> QueueResult<u64> {
        self.store.list_len(&self.config.dlq_name).await
    }

    /// Check store connectivity.
    pub async fn ping(&self) -> QueueResult<()> {
        self.store.ping().await
    }
}
