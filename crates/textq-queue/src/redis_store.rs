//! Redis implementation of the job store.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use crate::error::{QueueError, QueueResult};
use crate::store::JobStore;

/// Redis-backed store.
///
/// Opens a multiplexed connection per operation so that the process can
/// start (and report degraded health) while Redis is down.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    /// Create a store for the given Redis URL. Does not connect yet.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    async fn conn(&self) -> QueueResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))
    }
}

/// Redis expiry is whole seconds; never round a short TTL down to zero.
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// BLPOP timeout in whole seconds. Redis before 6.0 rejects fractional
/// values, and zero would block forever.
fn blpop_timeout_secs(timeout: Duration) -> u64 {
    timeout.as_secs().max(1)
}

#[async_trait]
impl JobStore for RedisStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn set_many_ex(&self, entries: &[(String, String)], ttl: Duration) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let secs = ttl_secs(ttl);

        // MULTI/EXEC: all keys land together or not at all
        let mut pipe = redis::pipe();
        pipe.atomic();
        for (key, value) in entries {
            pipe.set_ex(key, value, secs).ignore();
        }
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> QueueResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn push(&self, list: &str, value: &str) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        conn.rpush::<_, _, ()>(list, value).await?;
        Ok(())
    }

    async fn push_capped(&self, list: &str, value: &str, max_len: u64) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        let keep_from = -(max_len.max(1) as isize);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .rpush(list, value)
            .ignore()
            .ltrim(list, keep_from, -1)
            .ignore();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn pop(&self, list: &str) -> QueueResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = redis::cmd("LPOP").arg(list).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn pop_blocking(&self, list: &str, timeout: Duration) -> QueueResult<Option<String>> {
        let mut conn = self.conn().await?;

        // BLPOP replies with (list, value) or nil on timeout
        let reply: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(list)
            .arg(blpop_timeout_secs(timeout))
            .query_async(&mut conn)
            .await?;

        if reply.is_none() {
            debug!("BLPOP on {} timed out", list);
        }
        Ok(reply.map(|(_, value)| value))
    }

    async fn list_len(&self, list: &str) -> QueueResult<u64> {
        let mut conn = self.conn().await?;
        let len: u64 = conn.llen(list).await?;
        Ok(len)
    }

    async fn ping(&self) -> QueueResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_rounding() {
        assert_eq!(ttl_secs(Duration::from_secs(3600)), 3600);
        assert_eq!(ttl_secs(Duration::from_millis(200)), 1);
    }

    #[test]
    fn test_blpop_timeout_is_whole_seconds() {
        assert_eq!(blpop_timeout_secs(Duration::from_secs(5)), 5);
        assert_eq!(blpop_timeout_secs(Duration::from_millis(5900)), 5);
        assert_eq!(blpop_timeout_secs(Duration::from_millis(50)), 1);
    }

    #[test]
    fn test_rejects_malformed_url() {
        assert!(RedisStore::new("not a url").is_err());
        assert!(RedisStore::new("redis://localhost:6379/0").is_ok());
    }
}
