//! Job lifecycle controller
//!
//! Owns every write to job and result documents. Creation validates the upload
//! and stores a pending job; processing claims the job with a status
//! compare-and-set, runs the codec and aggregator, writes the result and only
//! then flips the job to its terminal status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{Job, JobId, JobResult, JobStatus, ResultStatus};
use crate::aggregate::{aggregate, AggregatedTotal};
use crate::codec::{self, FormatError};
use crate::error::{Error, LibResult};
use crate::storage::types::STATUS_FIELD;
use crate::storage::{job_key, result_key, JobStore, StorageError, JOBS_NAMESPACE};

/// Shortest upload accepted at submission
pub const DEFAULT_MIN_CSV_LENGTH: usize = 10;

/// Everything produced by one successful aggregation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    pub row_count: usize,
    pub skipped: usize,
    pub totals: Vec<AggregatedTotal>,
    pub csv_content: String,
}

/// Parse, aggregate and serialize an upload.
pub fn run_pipeline(raw: &str) -> Result<PipelineOutput, FormatError> {
    let report = codec::parse_report(raw)?;
    let totals = aggregate(&report.rows);
    let csv_content = codec::serialize(&totals);

    Ok(PipelineOutput {
        row_count: report.rows.len(),
        skipped: report.skipped,
        totals,
        csv_content,
    })
}

/// The fields of a job document the pending sweep needs
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingJob {
    job_id: JobId,
    created_at: DateTime<Utc>,
}

/// What a call to [`JobController::process`] did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ProcessOutcome {
    Completed {
        row_count: usize,
        department_count: usize,
    },
    Failed {
        message: String,
    },
    /// The job was not pending, so another trigger already claimed it
    Skipped,
}

/// Creates jobs and drives them through their state machine
pub struct JobController {
    store: Arc<dyn JobStore>,
    min_csv_length: usize,
    notifier: Option<mpsc::UnboundedSender<JobId>>,
}

impl JobController {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            min_csv_length: DEFAULT_MIN_CSV_LENGTH,
            notifier: None,
        }
    }

    /// Override the minimum accepted upload length
    pub fn with_min_csv_length(mut self, min_csv_length: usize) -> Self {
        self.min_csv_length = min_csv_length;
        self
    }

    /// Announce every created job on `notifier`
    pub fn with_notifier(mut self, notifier: mpsc::UnboundedSender<JobId>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Validate an upload and store it as a pending job.
    ///
    /// Returns as soon as the job document is written; processing happens on
    /// whatever trigger picks the job up.
    pub async fn create(&self, csv_data: &str) -> LibResult<JobId> {
        self.validate(csv_data)?;

        let job = Job::new(JobId::generate(), csv_data.to_string());
        let job_id = job.job_id.clone();
        let document = serde_json::to_value(&job).map_err(StorageError::from)?;
        self.store.set(&job_key(job_id.as_str()), document).await?;

        info!("Job created: {} ({} bytes)", job_id, csv_data.len());

        if let Some(notifier) = &self.notifier {
            if notifier.send(job_id.clone()).is_err() {
                warn!(
                    "No dispatcher listening for {}; it stays pending until the next sweep",
                    job_id
                );
            }
        }

        Ok(job_id)
    }

    /// Run the `pending → processing → completed | error` transitions for a job.
    ///
    /// Safe to call repeatedly or concurrently: only the caller that wins the
    /// status compare-and-set does any work; everyone else gets
    /// [`ProcessOutcome::Skipped`]. Codec failures end in the error state and are
    /// reported as [`ProcessOutcome::Failed`]; only store failures while
    /// recording the outcome are returned as errors.
    pub async fn process(&self, job_id: &JobId) -> LibResult<ProcessOutcome> {
        let key = job_key(job_id.as_str());

        let claimed = self
            .store
            .compare_and_set_status(
                &key,
                JobStatus::Pending.as_str(),
                JobStatus::Processing.as_str(),
            )
            .await?;
        if !claimed {
            debug!("Job {} is not pending, skipping", job_id);
            return Ok(ProcessOutcome::Skipped);
        }

        info!("Processing CSV for job: {}", job_id);

        match self.execute(job_id, &key).await {
            Ok(output) => self.complete(job_id, output).await,
            Err(err) => self.fail(job_id, err.to_string()).await,
        }
    }

    /// Process the oldest pending job, if any.
    ///
    /// For runtimes without an event trigger. Jobs claimed by a concurrent
    /// caller in the meantime are passed over.
    pub async fn process_next(&self) -> LibResult<Option<(JobId, ProcessOutcome)>> {
        for job_id in self.pending_jobs().await? {
            match self.process(&job_id).await? {
                ProcessOutcome::Skipped => continue,
                outcome => return Ok(Some((job_id, outcome))),
            }
        }
        Ok(None)
    }

    /// IDs of all pending jobs, oldest first
    pub async fn pending_jobs(&self) -> LibResult<Vec<JobId>> {
        let keys = self.store.list(&format!("{JOBS_NAMESPACE}/")).await?;
        let mut pending = Vec::new();

        for key in keys {
            let Some(document) = self.store.get(&key).await? else {
                continue;
            };
            let status = document.get(STATUS_FIELD).and_then(Value::as_str);
            if status != Some(JobStatus::Pending.as_str()) {
                continue;
            }
            match serde_json::from_value::<PendingJob>(document) {
                Ok(job) => pending.push((job.created_at, job.job_id)),
                Err(e) => warn!("Ignoring unreadable job document {}: {}", key, e),
            }
        }

        pending.sort();
        Ok(pending.into_iter().map(|(_, job_id)| job_id).collect())
    }

    fn validate(&self, csv_data: &str) -> LibResult<()> {
        if csv_data.trim().is_empty() {
            return Err(Error::Validation("No CSV data received".to_string()));
        }
        if csv_data.len() < self.min_csv_length {
            return Err(Error::Validation(format!(
                "CSV data too short ({} bytes, minimum {})",
                csv_data.len(),
                self.min_csv_length
            )));
        }
        Ok(())
    }

    /// Everything between claiming the job and writing its result
    async fn execute(&self, job_id: &JobId, key: &str) -> LibResult<PipelineOutput> {
        self.store
            .update(key, json!({ "startedAt": Utc::now() }))
            .await?;

        let document = self
            .store
            .get(key)
            .await?
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?;
        let job: Job = serde_json::from_value(document).map_err(StorageError::from)?;

        let output = run_pipeline(&job.csv_data)?;
        info!(
            "Processed {} rows into {} departments for job {} ({} skipped)",
            output.row_count,
            output.totals.len(),
            job_id,
            output.skipped
        );
        Ok(output)
    }

    async fn complete(&self, job_id: &JobId, output: PipelineOutput) -> LibResult<ProcessOutcome> {
        let row_count = output.row_count;
        let department_count = output.totals.len();
        let result = JobResult::completed(job_id.clone(), output);
        let document = serde_json::to_value(&result).map_err(StorageError::from)?;

        // Result first, so a poller never sees `completed` without one
        let key = result_key(job_id.as_str());
        if let Err(e) = self.store.set(&key, document).await {
            if self.completed_result_exists(&key).await {
                warn!("Result write for job {} reported {} but landed", job_id, e);
            } else {
                error!("Failed to store result for job {}: {}", job_id, e);
                return self
                    .fail(job_id, format!("Failed to store result: {e}"))
                    .await;
            }
        }

        self.store
            .update(
                &job_key(job_id.as_str()),
                json!({
                    "status": JobStatus::Completed,
                    "completedAt": Utc::now(),
                    "resultCount": department_count,
                }),
            )
            .await?;

        info!("Job completed: {}", job_id);
        Ok(ProcessOutcome::Completed {
            row_count,
            department_count,
        })
    }

    async fn completed_result_exists(&self, key: &str) -> bool {
        match self.store.get(key).await {
            Ok(Some(document)) => serde_json::from_value::<JobResult>(document)
                .is_ok_and(|result| result.status == ResultStatus::Completed),
            _ => false,
        }
    }

    async fn fail(&self, job_id: &JobId, message: String) -> LibResult<ProcessOutcome> {
        error!("Processing error for job {}: {}", job_id, message);

        let result = JobResult::failed(job_id.clone(), message.clone());
        let document = serde_json::to_value(&result).map_err(StorageError::from)?;
        self.store
            .set(&result_key(job_id.as_str()), document)
            .await?;

        self.store
            .update(
                &job_key(job_id.as_str()),
                json!({
                    "status": JobStatus::Error,
                    "erroredAt": Utc::now(),
                    "errorMessage": message,
                }),
            )
            .await?;

        Ok(ProcessOutcome::Failed { message })
    }
}
