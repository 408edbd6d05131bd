//! Storage abstraction for job and result documents
//!
//! The pipeline only depends on the [`JobStore`] trait: a key-value map of JSON
//! documents with an atomic status compare-and-set. Two backends ship with the
//! crate, an in-memory map and a directory of JSON files; both are wrapped in a
//! [`TimedStore`] by the factory so no call blocks indefinitely.

pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod timed;
pub mod traits;
pub mod types;


pub use backends::{FileBackend, MemoryBackend};
pub use config::{BackendType, FileConfig, MemoryConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::StorageFactory;
pub use timed::TimedStore;
pub use traits::JobStore;
pub use types::HealthStatus;

/// Namespace holding job documents
pub const JOBS_NAMESPACE: &str = "jobs";

/// Namespace holding result documents
pub const RESULTS_NAMESPACE: &str = "results";

/// Key of the job document for `job_id`
pub fn job_key(job_id: &str) -> String {
    format!("{JOBS_NAMESPACE}/{job_id}")
}

/// Key of the result document for `job_id`
pub fn result_key(job_id: &str) -> String {
    format!("{RESULTS_NAMESPACE}/{job_id}")
}
