//! Core trait definition for the job store

use async_trait::async_trait;
use serde_json::Value;

use super::error::StorageResult;
use super::types::HealthStatus;

/// Durable map from string keys to schemaless JSON documents.
///
/// Keys follow the `namespace/id` convention (`jobs/{jobId}`,
/// `results/{jobId}`). `compare_and_set_status` is the only operation that must
/// be atomic with respect to concurrent callers on the same key; every backend
/// guarantees that at most one caller observes `true` for a given transition.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Read a document, `None` if the key is absent
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Write a document, overwriting any previous value
    async fn set(&self, key: &str, value: Value) -> StorageResult<()>;

    /// Shallow-merge the fields of `fields` into an existing document
    async fn update(&self, key: &str, fields: Value) -> StorageResult<()>;

    /// Atomically replace the document's `status` field if it equals `expected`
    async fn compare_and_set_status(
        &self,
        key: &str,
        expected: &str,
        new: &str,
    ) -> StorageResult<bool>;

    /// List keys starting with `prefix`, sorted
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Check the health of the storage backend
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}
