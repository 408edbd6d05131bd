//! Application configuration
//!
//! Layered as: built-in defaults, then an optional YAML file, then
//! `SALES_ROLLUP_*` environment variables (highest priority).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::PollerConfig;
use crate::error::{Error, LibResult};
use crate::job::lifecycle::DEFAULT_MIN_CSV_LENGTH;
use crate::server::ServerConfig;
use crate::storage::StorageConfig;
use crate::worker::WorkerConfig;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "SALES_ROLLUP_";

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Verbosity level for logging, set from the CLI only
    #[serde(skip)]
    pub verbose: u8,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub worker: WorkerConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Submission checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Shortest upload accepted, in bytes
    #[serde(default = "default_min_csv_length")]
    pub min_csv_length: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_csv_length: default_min_csv_length(),
        }
    }
}

fn default_min_csv_length() -> usize {
    DEFAULT_MIN_CSV_LENGTH
}

impl AppConfig {
    /// Load defaults, the optional YAML file, then environment overrides
    pub fn load(path: Option<&Path>) -> LibResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: &Path) -> LibResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> LibResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Apply `SALES_ROLLUP_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> LibResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(bind) = var("BIND") {
            self.server.bind = bind;
        }
        if let Some(url) = var("PUBLIC_URL") {
            self.server.public_url = Some(url);
        }
        if let Some(backend) = var("STORAGE_TYPE") {
            self.storage.backend = backend.parse().map_err(Error::Config)?;
        }
        if let Some(dir) = var("STORAGE_DIR") {
            self.storage.file.base_dir = Some(PathBuf::from(dir));
        }
        if let Some(timeout) = var("STORAGE_TIMEOUT") {
            self.storage.timeout = parse_duration("STORAGE_TIMEOUT", &timeout)?;
        }
        if let Some(jobs) = var("MAX_CONCURRENT_JOBS") {
            self.worker.max_concurrent_jobs = parse_number("MAX_CONCURRENT_JOBS", &jobs)?;
        }
        if let Some(interval) = var("SWEEP_INTERVAL") {
            self.worker.sweep_interval = parse_duration("SWEEP_INTERVAL", &interval)?;
        }
        if let Some(interval) = var("POLL_INTERVAL") {
            self.poller.interval = parse_duration("POLL_INTERVAL", &interval)?;
        }
        if let Some(attempts) = var("POLL_MAX_ATTEMPTS") {
            self.poller.max_attempts = parse_number("POLL_MAX_ATTEMPTS", &attempts)?;
        }
        if let Some(length) = var("MIN_CSV_LENGTH") {
            self.validation.min_csv_length = parse_number("MIN_CSV_LENGTH", &length)?;
        }
        Ok(())
    }

    /// Get the log level string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            2 => "trace",
            _ => "trace,hyper=debug,tower=debug",
        }
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }
}

fn parse_duration(name: &str, value: &str) -> LibResult<Duration> {
    humantime_serde::re::humantime::parse_duration(value)
        .map_err(|e| Error::Config(format!("{ENV_PREFIX}{name}: invalid duration {value:?}: {e}")))
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> LibResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{ENV_PREFIX}{name}: invalid number {value:?}: {e}")))
}
