//! Timeout wrapper applied around any job store
//!
//! Only reads are bounded. Writes are awaited to completion: a write abandoned
//! at the deadline may still land on the blocking pool, leaving its outcome
//! unknown to the caller.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::error::{StorageError, StorageResult};
use super::traits::JobStore;
use super::types::HealthStatus;

/// Bounds reads on the inner store by a fixed timeout.
pub struct TimedStore {
    inner: Arc<dyn JobStore>,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn JobStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T>(&self, op: impl Future<Output = StorageResult<T>>) -> StorageResult<T> {
        tokio::time::timeout(self.timeout, op)
            .await
            .map_err(|_| StorageError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl JobStore for TimedStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.bounded(self.inner.get(key)).await
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        self.inner.set(key, value).await
    }

    async fn update(&self, key: &str, fields: Value) -> StorageResult<()> {
        self.inner.update(key, fields).await
    }

    async fn compare_and_set_status(
        &self,
        key: &str,
        expected: &str,
        new: &str,
    ) -> StorageResult<bool> {
        self.inner.compare_and_set_status(key, expected, new).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.bounded(self.inner.list(prefix)).await
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        self.bounded(self.inner.health_check()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backends::MemoryBackend;
    use serde_json::json;

    #[tokio::test]
    async fn test_slow_reads_time_out() {
        let slow = Arc::new(MemoryBackend::with_latency(Duration::from_millis(200)));
        let store = TimedStore::new(slow, Duration::from_millis(20));

        let err = store.get("jobs/a").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout(_)));
        assert!(err.is_retryable());

        let err = store.list("jobs/").await.unwrap_err();
        assert!(matches!(err, StorageError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_slow_writes_run_to_completion() {
        let slow = MemoryBackend::with_latency(Duration::from_millis(100));
        let store = TimedStore::new(Arc::new(slow.clone()), Duration::from_millis(10));

        store.set("jobs/a", json!({"status": "pending"})).await.unwrap();
        assert!(store
            .compare_and_set_status("jobs/a", "pending", "processing")
            .await
            .unwrap());
        store.update("jobs/a", json!({"extra": 1})).await.unwrap();

        let document = slow.get("jobs/a").await.unwrap().unwrap();
        assert_eq!(document["status"], "processing");
        assert_eq!(document["extra"], 1);
    }

    #[tokio::test]
    async fn test_fast_store_passes_through() {
        let store = TimedStore::new(Arc::new(MemoryBackend::default()), Duration::from_secs(1));
        store.set("jobs/a", json!({"status": "pending"})).await.unwrap();
        assert!(store
            .compare_and_set_status("jobs/a", "pending", "processing")
            .await
            .unwrap());
        assert_eq!(store.list("jobs/").await.unwrap(), vec!["jobs/a"]);
    }
}
