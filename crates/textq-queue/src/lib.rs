//! Job store and FIFO queue.
//!
//! This crate provides:
//! - The `JobStore` capability (key/value with expiry plus FIFO lists)
//! - A Redis implementation and an in-memory implementation
//! - `JobQueue`, the job lifecycle protocol shared by the API and the worker

pub mod error;
pub mod memory;
pub mod queue;
pub mod redis_store;
pub mod store;

pub use error::{QueueError, QueueResult};
pub use memory::InMemoryStore;
pub use queue::{JobQueue, QueueConfig, DEFAULT_DLQ_MAX_LEN, DEFAULT_JOB_TTL_SECS};
pub use redis_store::RedisStore;
pub use store::JobStore;
