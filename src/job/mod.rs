//! Job records, result records and their lifecycle
//!
//! A job moves `pending → processing → completed | error` and never leaves a
//! terminal state. The [`lifecycle::JobController`] is the only writer of job
//! and result documents; [`status::StatusService`] only reads them.

pub mod lifecycle;
pub mod status;

pub use lifecycle::{run_pipeline, JobController, PipelineOutput, ProcessOutcome};
pub use status::{Download, ReportedStatus, StatusReport, StatusService};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::aggregate::AggregatedTotal;

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Opaque job identifier: `job_{unix_millis}_{9 base36 chars}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Allocate a fresh identifier
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_SUFFIX_ALPHABET[rng.random_range(0..ID_SUFFIX_ALPHABET.len())] as char)
            .collect();
        Self(format!("job_{}_{}", Utc::now().timestamp_millis(), suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl JobStatus {
    /// Wire representation, as stored in the `status` field
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable record of one aggregation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: JobId,
    /// Raw upload, kept for reprocessing and audit
    pub csv_data: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errored_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of departments in the result, set on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_count: Option<usize>,
}

impl Job {
    /// A freshly submitted job in the pending state
    pub fn new(job_id: JobId, csv_data: String) -> Self {
        Self {
            job_id,
            csv_data,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            errored_at: None,
            error_message: None,
            result_count: None,
        }
    }
}

/// Terminal status recorded on a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Error,
}

/// Terminal artifact of a job, written exactly once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub job_id: JobId,
    pub status: ResultStatus,
    #[serde(default)]
    pub aggregated_data: Vec<AggregatedTotal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub department_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl JobResult {
    /// Result of a successful aggregation
    pub fn completed(job_id: JobId, output: PipelineOutput) -> Self {
        Self {
            filename: Some(result_filename(&job_id)),
            department_count: output.totals.len(),
            row_count: output.row_count,
            aggregated_data: output.totals,
            csv_content: Some(output.csv_content),
            error_message: None,
            status: ResultStatus::Completed,
            timestamp: Utc::now(),
            job_id,
        }
    }

    /// Result of a failed aggregation
    pub fn failed(job_id: JobId, message: impl Into<String>) -> Self {
        Self {
            job_id,
            status: ResultStatus::Error,
            aggregated_data: Vec::new(),
            csv_content: None,
            filename: None,
            row_count: 0,
            department_count: 0,
            error_message: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Suggested download filename for a job's result
pub fn result_filename(job_id: &JobId) -> String {
    format!("processed_sales_{job_id}.csv")
}
