//! In-memory storage backend

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::storage::{
    config::MemoryConfig,
    error::{StorageError, StorageResult},
    traits::JobStore,
    types::{merge_fields, split_key, swap_status, HealthStatus},
};

/// In-memory storage backend
///
/// Documents live in a `BTreeMap` behind a `tokio` `RwLock`. Every mutation,
/// including the compare-and-set, runs under the write lock, so concurrent
/// transitions on the same key are serialized.
#[derive(Clone)]
pub struct MemoryBackend {
    config: MemoryConfig,
    documents: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl MemoryBackend {
    /// Create a new memory backend
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            config: config.clone(),
            documents: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Create a memory backend that sleeps for `latency` inside every operation
    pub fn with_latency(latency: Duration) -> Self {
        Self::new(&MemoryConfig {
            latency: Some(latency),
        })
    }

    /// Number of stored documents
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Whether the store holds no documents
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.config.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(&MemoryConfig::default())
    }
}

#[async_trait]
impl JobStore for MemoryBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        split_key(key)?;
        self.simulate_latency().await;
        Ok(self.documents.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        split_key(key)?;
        self.simulate_latency().await;
        self.documents.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn update(&self, key: &str, fields: Value) -> StorageResult<()> {
        split_key(key)?;
        let mut documents = self.documents.write().await;
        self.simulate_latency().await;

        let document = documents
            .get_mut(key)
            .ok_or_else(|| StorageError::not_found(key))?;
        merge_fields(document, fields)
    }

    async fn compare_and_set_status(
        &self,
        key: &str,
        expected: &str,
        new: &str,
    ) -> StorageResult<bool> {
        split_key(key)?;
        let mut documents = self.documents.write().await;
        // Hold the lock across the delay so racing callers queue behind us
        self.simulate_latency().await;

        match documents.get_mut(key) {
            Some(document) => swap_status(document, expected, new),
            None => Ok(false),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        self.simulate_latency().await;
        Ok(self
            .documents
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus {
            healthy: true,
            backend_type: "memory".to_string(),
            documents: self.documents.read().await.len(),
            errors: vec![],
        })
    }
}
