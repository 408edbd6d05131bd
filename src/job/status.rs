//! Read-only status and download queries

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{Job, JobId, JobResult, JobStatus, ResultStatus};
use crate::error::{Error, LibResult};
use crate::storage::{job_key, result_key, JobStore, StorageError};

/// Status reported to pollers; `unknown` when no job exists for the ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportedStatus {
    Pending,
    Processing,
    Completed,
    Error,
    Unknown,
}

impl ReportedStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportedStatus::Completed | ReportedStatus::Error)
    }
}

impl From<JobStatus> for ReportedStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => ReportedStatus::Pending,
            JobStatus::Processing => ReportedStatus::Processing,
            JobStatus::Completed => ReportedStatus::Completed,
            JobStatus::Error => ReportedStatus::Error,
        }
    }
}

/// Snapshot of a job and its result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub job_id: JobId,
    pub status: ReportedStatus,
    pub job: Option<Job>,
    pub result: Option<JobResult>,
    pub timestamp: DateTime<Utc>,
}

impl StatusReport {
    /// Error message of a failed job, from the result or the job record
    pub fn error_message(&self) -> Option<&str> {
        self.result
            .as_ref()
            .and_then(|result| result.error_message.as_deref())
            .or_else(|| self.job.as_ref().and_then(|job| job.error_message.as_deref()))
    }
}

/// Completed result CSV ready to hand to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub content: String,
    pub filename: String,
}

/// Answers polling queries by reading job and result documents
#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn JobStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Current status of `job_id`.
    ///
    /// An unknown ID is not an error: the report carries
    /// [`ReportedStatus::Unknown`] with no job and no result.
    pub async fn get_status(&self, job_id: &JobId) -> LibResult<StatusReport> {
        // Job before result: results are written before the job turns terminal
        let job: Option<Job> = self.read(&job_key(job_id.as_str())).await?;
        let result: Option<JobResult> = self.read(&result_key(job_id.as_str())).await?;

        let status = job
            .as_ref()
            .map(|job| ReportedStatus::from(job.status))
            .unwrap_or(ReportedStatus::Unknown);
        debug!("Status of {}: {:?}", job_id, status);

        Ok(StatusReport {
            job_id: job_id.clone(),
            status,
            job,
            result,
            timestamp: Utc::now(),
        })
    }

    /// Result CSV of a completed job, `NotFound` otherwise
    pub async fn get_download(&self, job_id: &JobId) -> LibResult<Download> {
        let result: Option<JobResult> = self.read(&result_key(job_id.as_str())).await?;

        match result {
            Some(JobResult {
                status: ResultStatus::Completed,
                csv_content: Some(content),
                filename,
                ..
            }) => Ok(Download {
                content,
                filename: filename.unwrap_or_else(|| super::result_filename(job_id)),
            }),
            _ => Err(Error::NotFound(format!(
                "Result not found or not ready for {job_id}"
            ))),
        }
    }

    /// Read a document; keys no job could have are simply absent
    async fn read<T: DeserializeOwned>(&self, key: &str) -> LibResult<Option<T>> {
        match self.store.get(key).await {
            Ok(Some(document)) => Ok(Some(
                serde_json::from_value(document).map_err(StorageError::from)?,
            )),
            Ok(None) => Ok(None),
            Err(StorageError::InvalidKey(_)) => {
                debug!("Rejected lookup of invalid key {}", key);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
