//! In-memory job store for tests and local development.
//!
//! Expiry uses tokio's clock so tests can run with a paused clock and
//! advance time instead of sleeping.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::QueueResult;
use crate::store::JobStore;

#[derive(Default)]
struct Inner {
    values: HashMap<String, (String, Instant)>,
    lists: HashMap<String, VecDeque<String>>,
}

/// In-memory store with the same expiry and FIFO semantics as Redis.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    pushed: Notify,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn try_pop(&self, list: &str) -> Option<String> {
        self.lock().lists.get_mut(list).and_then(VecDeque::pop_front)
    }

    /// Snapshot of a list's items, head first.
    pub fn list_items(&self, list: &str) -> Vec<String> {
        self.lock()
            .lists
            .get(list)
            .map(|items| items.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> QueueResult<()> {
        let expires_at = Instant::now() + ttl;
        self.lock()
            .values
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn set_many_ex(&self, entries: &[(String, String)], ttl: Duration) -> QueueResult<()> {
        let expires_at = Instant::now() + ttl;
        let mut inner = self.lock();
        for (key, value) in entries {
            inner.values.insert(key.clone(), (value.clone(), expires_at));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> QueueResult<Option<String>> {
        let mut inner = self.lock();
        let now = Instant::now();
        match inner.values.get(key) {
            Some((value, expires_at)) if *expires_at > now => Ok(Some(value.clone())),
            Some(_) => {
                inner.values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> QueueResult<()> {
        self.lock().values.remove(key);
        Ok(())
    }

    async fn push(&self, list: &str, value: &str) -> QueueResult<()> {
        self.lock()
            .lists
            .entry(list.to_string())
            .or_default()
            .push_back(value.to_string());
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn push_capped(&self, list: &str, value: &str, max_len: u64) -> QueueResult<()> {
        {
            let mut inner = self.lock();
            let items = inner.lists.entry(list.to_string()).or_default();
            items.push_back(value.to_string());
            let excess = items.len().saturating_sub(max_len.max(1) as usize);
            items.drain(..excess);
        }
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn pop(&self, list: &str) -> QueueResult<Option<String>> {
        Ok(self.try_pop(list))
    }

    async fn pop_blocking(&self, list: &str, timeout: Duration) -> QueueResult<Option<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register for wakeups before checking, so a push between the
            // check and the wait is not missed.
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_pop(list) {
                return Ok(Some(value));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn list_len(&self, list: &str) -> QueueResult<u64> {
        Ok(self.lock().lists.get(list).map_or(0, |items| items.len() as u64))
    }

    async fn ping(&self) -> QueueResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_value_expires_after_ttl() {
        let store = InMemoryStore::new();
        store.set_ex("k", "v", Duration::from_secs(10)).await.unwrap();

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rewrite_refreshes_ttl() {
        let store = InMemoryStore::new();
        store.set_ex("k", "a", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        store.set_ex("k", "b", Duration::from_secs(10)).await.unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_list_is_fifo() {
        let store = InMemoryStore::new();
        store.push("q", "1").await.unwrap();
        store.push("q", "2").await.unwrap();
        assert_eq!(store.list_len("q").await.unwrap(), 2);

        let timeout = Duration::from_millis(10);
        assert_eq!(store.pop_blocking("q", timeout).await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.pop_blocking("q", timeout).await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.list_len("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_capped_push_drops_oldest() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store.push_capped("dead", &i.to_string(), 3).await.unwrap();
        }
        assert_eq!(store.list_items("dead"), vec!["2", "3", "4"]);

        assert_eq!(store.pop("dead").await.unwrap().as_deref(), Some("2"));
        assert_eq!(store.pop("empty").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_removes_key() {
        let store = InMemoryStore::new();
        store.set_ex("k", "v", Duration::from_secs(10)).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("missing").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pop_times_out_on_empty_list() {
        let store = InMemoryStore::new();
        let popped = store.pop_blocking("q", Duration::from_secs(5)).await.unwrap();
        assert_eq!(popped, None);
    }

    #[tokio::test]
    async fn test_pop_wakes_on_push() {
        let store = Arc::new(InMemoryStore::new());
        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.pop_blocking("q", Duration::from_secs(5)).await })
        };

        tokio::task::yield_now().await;
        store.push("q", "payload").await.unwrap();

        let popped = waiter.await.unwrap().unwrap();
        assert_eq!(popped.as_deref(), Some("payload"));
    }

    #[tokio::test]
    async fn test_each_item_delivered_once() {
        let store = Arc::new(InMemoryStore::new());
        for i in 0..20 {
            store.push("q", &i.to_string()).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..4 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                let mut got = Vec::new();
                while let Some(v) = store.pop_blocking("q", Duration::from_millis(20)).await.unwrap() {
                    got.push(v);
                }
                got
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_by_key(|v| v.parse::<u32>().unwrap());
        let expected: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        assert_eq!(all, expected);
    }
}
