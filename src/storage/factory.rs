//! Storage factory for creating job store instances

use std::sync::Arc;
use tracing::debug;

use super::backends::{FileBackend, MemoryBackend};
use super::config::{BackendType, StorageConfig};
use super::error::StorageResult;
use super::timed::TimedStore;
use super::traits::JobStore;

/// Factory for creating storage instances
pub struct StorageFactory;

impl StorageFactory {
    /// Create a store from explicit configuration, bounded by `config.timeout`
    pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn JobStore>> {
        let backend: Arc<dyn JobStore> = match config.backend {
            BackendType::Memory => Arc::new(MemoryBackend::new(&config.memory)),
            BackendType::File => Arc::new(FileBackend::new(&config.file).await?),
        };

        debug!(
            "Created {:?} job store with {:?} timeout",
            config.backend, config.timeout
        );

        Ok(Arc::new(TimedStore::new(backend, config.timeout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_factory_creates_file_backend() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::file(temp_dir.path());

        let storage = StorageFactory::from_config(&config).await.unwrap();
        let health = storage.health_check().await.unwrap();
        assert!(health.healthy);
        assert_eq!(health.backend_type, "file");
    }

    #[tokio::test]
    async fn test_factory_creates_memory_backend() {
        let storage = StorageFactory::from_config(&StorageConfig::memory())
            .await
            .unwrap();
        let health = storage.health_check().await.unwrap();
        assert_eq!(health.backend_type, "memory");
        assert_eq!(health.documents, 0);
    }
}
