//! Submit-and-poll loop
//!
//! After submitting, the poller queries status at a fixed interval up to a
//! bounded number of attempts. Giving up is purely client-side: the job keeps
//! running and its records are never touched.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::JobClient;
use crate::error::LibResult;
use crate::job::{Download, JobId, ReportedStatus};

/// Polling cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Delay between status queries
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,

    /// Status queries before giving up
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_max_attempts() -> u32 {
    30
}

/// How a poll ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { job_id: JobId, download: Download },
    Failed { job_id: JobId, message: String },
    /// Attempts exhausted before the job reached a terminal state
    TimedOut { job_id: JobId, attempts: u32 },
}

impl PollOutcome {
    pub fn job_id(&self) -> &JobId {
        match self {
            PollOutcome::Completed { job_id, .. }
            | PollOutcome::Failed { job_id, .. }
            | PollOutcome::TimedOut { job_id, .. } => job_id,
        }
    }
}

pub struct Poller<C> {
    client: C,
    config: PollerConfig,
}

impl<C: JobClient> Poller<C> {
    pub fn new(client: C, config: PollerConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Submit `csv_data` and wait for the job to finish
    pub async fn run(&self, csv_data: &str) -> LibResult<PollOutcome> {
        let submission = self.client.submit(csv_data).await?;
        info!("Submitted job {}", submission.job_id);
        self.wait(&submission.job_id).await
    }

    /// Poll an existing job until it finishes or attempts run out.
    ///
    /// Transport and store errors while polling end the loop and are returned
    /// as-is.
    pub async fn wait(&self, job_id: &JobId) -> LibResult<PollOutcome> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 1..=max_attempts {
            let report = self.client.status(job_id).await?;
            debug!(
                "Poll {}/{} for {}: {:?}",
                attempt, max_attempts, job_id, report.status
            );

            match report.status {
                ReportedStatus::Completed => {
                    let download = self.client.download(job_id).await?;
                    return Ok(PollOutcome::Completed {
                        job_id: job_id.clone(),
                        download,
                    });
                }
                ReportedStatus::Error => {
                    let message = report
                        .error_message()
                        .unwrap_or("Processing failed")
                        .to_string();
                    return Ok(PollOutcome::Failed {
                        job_id: job_id.clone(),
                        message,
                    });
                }
                ReportedStatus::Pending | ReportedStatus::Processing | ReportedStatus::Unknown => {}
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        warn!(
            "Gave up on job {} after {} status checks",
            job_id, max_attempts
        );
        Ok(PollOutcome::TimedOut {
            job_id: job_id.clone(),
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{LocalClient, Submission};
    use crate::error::Error;
    use crate::job::{JobController, StatusReport, StatusService};
    use crate::storage::{JobStore, MemoryBackend};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const SAMPLE: &str = "Department Name,Date,Number of Sales\nToys,2023-08-01,7\n";

    fn fast() -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(5),
            max_attempts: 5,
        }
    }

    /// Reports a fixed status and counts how often it was asked
    struct StubClient {
        status: ReportedStatus,
        queries: AtomicU32,
    }

    #[async_trait]
    impl JobClient for StubClient {
        async fn submit(&self, _csv_data: &str) -> LibResult<Submission> {
            Ok(Submission {
                job_id: JobId::from("job_1_stub"),
                status_url: None,
                download_url: None,
            })
        }

        async fn status(&self, job_id: &JobId) -> LibResult<StatusReport> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(StatusReport {
                job_id: job_id.clone(),
                status: self.status,
                job: None,
                result: None,
                timestamp: Utc::now(),
            })
        }

        async fn download(&self, job_id: &JobId) -> LibResult<Download> {
            Err(Error::NotFound(job_id.to_string()))
        }
    }

    #[tokio::test]
    async fn test_times_out_after_max_attempts() {
        let poller = Poller::new(
            StubClient {
                status: ReportedStatus::Processing,
                queries: AtomicU32::new(0),
            },
            fast(),
        );

        let outcome = poller.run(SAMPLE).await.unwrap();
        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                job_id: JobId::from("job_1_stub"),
                attempts: 5
            }
        );
        assert_eq!(poller.client().queries.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_error_status_stops_polling() {
        let poller = Poller::new(
            StubClient {
                status: ReportedStatus::Error,
                queries: AtomicU32::new(0),
            },
            fast(),
        );

        let outcome = poller.run(SAMPLE).await.unwrap();
        assert!(matches!(outcome, PollOutcome::Failed { ref message, .. } if message == "Processing failed"));
        assert_eq!(poller.client().queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_completed_job_is_downloaded() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryBackend::default());
        let controller = Arc::new(JobController::new(Arc::clone(&store)));
        let client = LocalClient::new(Arc::clone(&controller), StatusService::new(store));

        let submission = client.submit(SAMPLE).await.unwrap();
        controller.process(&submission.job_id).await.unwrap();

        let poller = Poller::new(client, fast());
        match poller.wait(&submission.job_id).await.unwrap() {
            PollOutcome::Completed { download, .. } => {
                assert_eq!(
                    download.content,
                    "Department Name,Total Number of Sales\n\"Toys\",7\n"
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_leaves_job_untouched() {
        let store: Arc<dyn JobStore> = Arc::new(MemoryBackend::default());
        let controller = Arc::new(JobController::new(Arc::clone(&store)));
        let status = StatusService::new(Arc::clone(&store));
        let poller = Poller::new(
            LocalClient::new(Arc::clone(&controller), status.clone()),
            PollerConfig {
                interval: Duration::from_millis(1),
                max_attempts: 3,
            },
        );

        // Nothing processes the job, so polling must give up
        let outcome = poller.run(SAMPLE).await.unwrap();
        let PollOutcome::TimedOut { job_id, .. } = outcome else {
            panic!("expected timeout");
        };
        assert_eq!(
            status.get_status(&job_id).await.unwrap().status,
            ReportedStatus::Pending
        );

        // The job can still complete afterwards
        controller.process(&job_id).await.unwrap();
        assert_eq!(
            status.get_status(&job_id).await.unwrap().status,
            ReportedStatus::Completed
        );
    }

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.max_attempts, 30);
    }
}
