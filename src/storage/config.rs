//! Storage configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// In-memory storage (default, lost on restart)
    #[default]
    Memory,
    /// JSON documents on the local filesystem
    File,
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Main storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: BackendType,

    /// Upper bound for any single store operation
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,

    /// File backend settings
    #[serde(default)]
    pub file: FileConfig,

    /// Memory backend settings
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            timeout: default_timeout(),
            file: FileConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl StorageConfig {
    /// In-memory configuration, mostly for tests
    pub fn memory() -> Self {
        Self::default()
    }

    /// File configuration rooted at `base_dir`
    pub fn file(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendType::File,
            file: FileConfig {
                base_dir: Some(base_dir.into()),
            },
            ..Self::default()
        }
    }
}

/// File storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Base directory for documents (default: ~/.sales-rollup)
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Resolve the base directory, falling back to the home directory
    pub fn resolved_base_dir(&self) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|home| home.join(".sales-rollup"))
                .unwrap_or_else(|| PathBuf::from(".sales-rollup"))
        })
    }
}

/// Memory storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Artificial delay added to every operation, used to widen race windows
    #[serde(with = "humantime_serde", default)]
    pub latency: Option<Duration>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
