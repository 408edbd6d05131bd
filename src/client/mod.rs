//! Clients for submitting jobs and following them to completion
//!
//! [`JobClient`] is the seam between the [`Poller`] and the pipeline. The
//! [`LocalClient`] talks to an in-process controller; the [`HttpClient`] talks
//! to a running server.

pub mod http;
pub mod poller;

pub use http::HttpClient;
pub use poller::{PollOutcome, Poller, PollerConfig};

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::LibResult;
use crate::job::{Download, JobController, JobId, StatusReport, StatusService};

/// Accepted submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub job_id: JobId,
    pub status_url: Option<String>,
    pub download_url: Option<String>,
}

/// Operations a poller needs from the pipeline
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Submit raw CSV text as a new job
    async fn submit(&self, csv_data: &str) -> LibResult<Submission>;

    /// Current status of a job
    async fn status(&self, job_id: &JobId) -> LibResult<StatusReport>;

    /// Result CSV of a completed job
    async fn download(&self, job_id: &JobId) -> LibResult<Download>;
}

/// Client bound directly to an in-process controller and status service
#[derive(Clone)]
pub struct LocalClient {
    controller: Arc<JobController>,
    status: StatusService,
}

impl LocalClient {
    pub fn new(controller: Arc<JobController>, status: StatusService) -> Self {
        Self { controller, status }
    }
}

#[async_trait]
impl JobClient for LocalClient {
    async fn submit(&self, csv_data: &str) -> LibResult<Submission> {
        let job_id = self.controller.create(csv_data).await?;
        Ok(Submission {
            job_id,
            status_url: None,
            download_url: None,
        })
    }

    async fn status(&self, job_id: &JobId) -> LibResult<StatusReport> {
        self.status.get_status(job_id).await
    }

    async fn download(&self, job_id: &JobId) -> LibResult<Download> {
        self.status.get_download(job_id).await
    }
}
