//! The store capability shared by every component.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueResult;

/// Key/value store with per-key expiry plus FIFO lists.
///
/// Every operation is a single atomic store primitive. `set_many_ex` is
/// the only multi-key operation and must apply all writes or none.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Write `value` under `key`, expiring after `ttl`.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> QueueResult<()>;

    /// Write several keys atomically, each expiring after `ttl`.
    async fn set_many_ex(&self, entries: &[(String, String)], ttl: Duration) -> QueueResult<()>;

    /// Read a key; `None` when absent or expired.
    async fn get(&self, key: &str) -> QueueResult<Option<String>>;

    /// Remove a key. Absent keys are not an error.
    async fn delete(&self, key: &str) -> QueueResult<()>;

    /// Append to the tail of a list.
    async fn push(&self, list: &str, value: &str) -> QueueResult<()>;

    /// Append to the tail of a list, then drop the oldest items so that at
    /// most `max_len` remain. Both steps apply atomically.
    async fn push_capped(&self, list: &str, value: &str, max_len: u64) -> QueueResult<()>;

    /// Pop from the head of a list without waiting.
    async fn pop(&self, list: &str) -> QueueResult<Option<String>>;

    /// Pop from the head of a list, waiting up to `timeout` for an item.
    ///
    /// Each pushed item is handed to exactly one caller.
    async fn pop_blocking(&self, list: &str, timeout: Duration) -> QueueResult<Option<String>>;

    /// Number of items in a list.
    async fn list_len(&self, list: &str) -> QueueResult<u64>;

    /// Round-trip check against the store.
    async fn ping(&self) -> QueueResult<()>;
}
