//! File-based storage backend implementation
//!
//! Each document is a pretty-printed JSON file at
//! `{base_dir}/{namespace}/{id}.json`. Writes go to a temporary sibling file
//! and are renamed into place so readers never see a torn document.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::storage::{
    config::FileConfig,
    error::{StorageError, StorageResult},
    traits::JobStore,
    types::{merge_fields, split_key, swap_status, HealthStatus},
};

const DOCUMENT_EXTENSION: &str = "json";

/// File-based storage backend
pub struct FileBackend {
    base_dir: PathBuf,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Create a new file backend, creating the base directory if needed
    pub async fn new(config: &FileConfig) -> StorageResult<Self> {
        let base_dir = config.resolved_base_dir();

        fs::create_dir_all(&base_dir).await?;

        Ok(Self {
            base_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of this backend
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn document_path(&self, key: &str) -> StorageResult<PathBuf> {
        let (namespace, id) = split_key(key)?;
        Ok(self
            .base_dir
            .join(namespace)
            .join(format!("{id}.{DOCUMENT_EXTENSION}")))
    }

    async fn read_document(&self, path: &Path) -> StorageResult<Option<Value>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn write_document(&self, path: &Path, value: &Value) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(value)?;
        let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4()));

        fs::write(&temp_path, content).await?;
        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }
        Ok(())
    }
}

#[async_trait]
impl JobStore for FileBackend {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let path = self.document_path(key)?;
        self.read_document(&path).await
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<()> {
        let path = self.document_path(key)?;
        let _guard = self.write_lock.lock().await;
        self.write_document(&path, &value).await
    }

    async fn update(&self, key: &str, fields: Value) -> StorageResult<()> {
        let path = self.document_path(key)?;
        let _guard = self.write_lock.lock().await;

        let mut document = self
            .read_document(&path)
            .await?
            .ok_or_else(|| StorageError::not_found(key))?;
        merge_fields(&mut document, fields)?;
        self.write_document(&path, &document).await
    }

    async fn compare_and_set_status(
        &self,
        key: &str,
        expected: &str,
        new: &str,
    ) -> StorageResult<bool> {
        let path = self.document_path(key)?;
        let _guard = self.write_lock.lock().await;

        let Some(mut document) = self.read_document(&path).await? else {
            return Ok(false);
        };
        if !swap_status(&mut document, expected, new)? {
            return Ok(false);
        }
        self.write_document(&path, &document).await?;
        Ok(true)
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let (namespace, id_prefix) = prefix.split_once('/').unwrap_or((prefix, ""));
        let dir = self.base_dir.join(namespace);

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let key = format!("{namespace}/{id}");
            if id.starts_with(id_prefix) && key.starts_with(prefix) {
                keys.push(key);
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let mut errors = Vec::new();
        let mut documents = 0;

        for namespace in ["jobs", "results"] {
            match self.list(&format!("{namespace}/")).await {
                Ok(keys) => documents += keys.len(),
                Err(e) => errors.push(e.to_string()),
            }
        }

        Ok(HealthStatus {
            healthy: errors.is_empty() && self.base_dir.is_dir(),
            backend_type: "file".to_string(),
            documents,
            errors,
        })
    }
}
