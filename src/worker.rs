//! Background dispatcher that turns job creation into processing
//!
//! Two triggers feed the same [`JobController::process`] call:
//!
//! - job IDs announced by the controller over an mpsc channel as jobs are
//!   created, and
//! - a periodic sweep over pending jobs, which picks up anything a missed or
//!   dropped announcement left behind (including jobs persisted before a
//!   restart).
//!
//! A job already queued or running is not dispatched again, so a backlog
//! larger than the concurrency limit does not pile up tasks on every sweep.
//! Anything that still slips through (another process, a restart) is turned
//! into a no-op by the controller's status compare-and-set.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use crate::job::{JobController, JobId, ProcessOutcome};

/// Dispatcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Jobs aggregated at the same time
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Interval between sweeps for pending jobs
    #[serde(with = "humantime_serde", default = "default_sweep_interval")]
    pub sweep_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(5)
}

/// Processes jobs as they are announced or found pending
pub struct Dispatcher {
    controller: Arc<JobController>,
    announcements: mpsc::UnboundedReceiver<JobId>,
    permits: Arc<Semaphore>,
    sweep_interval: Duration,
    /// Jobs with a task queued or running
    queued: HashSet<JobId>,
}

/// Handle to a running dispatcher
pub struct DispatcherHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Stop accepting work and wait for in-flight jobs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!("Dispatcher task panicked: {}", e);
        }
    }
}

impl Dispatcher {
    pub fn new(
        controller: Arc<JobController>,
        announcements: mpsc::UnboundedReceiver<JobId>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            controller,
            announcements,
            permits: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
            sweep_interval: config.sweep_interval,
            queued: HashSet::new(),
        }
    }

    /// Run the dispatcher on the current runtime
    pub fn spawn(self) -> DispatcherHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        DispatcherHandle { shutdown, task }
    }

    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut in_flight = JoinSet::new();
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Dispatcher started (max {} concurrent jobs, sweep every {:?})",
            self.permits.available_permits(),
            self.sweep_interval
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                announced = self.announcements.recv() => match announced {
                    Some(job_id) => self.dispatch(&mut in_flight, job_id),
                    None => {
                        warn!("Job announcement channel closed");
                        break;
                    }
                },
                _ = sweep.tick() => self.sweep(&mut in_flight).await,
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    self.finished(joined);
                }
            }
        }

        debug!("Dispatcher draining {} job task(s)", in_flight.len());
        while let Some(joined) = in_flight.join_next().await {
            self.finished(joined);
        }
        info!("Dispatcher stopped");
    }

    async fn sweep(&mut self, in_flight: &mut JoinSet<JobId>) {
        let pending = self.controller.pending_jobs().await;
        match pending {
            Ok(pending) => {
                if !pending.is_empty() {
                    debug!("Sweep found {} pending job(s)", pending.len());
                }
                for job_id in pending {
                    self.dispatch(in_flight, job_id);
                }
            }
            Err(e) => error!("Sweep for pending jobs failed: {}", e),
        }
    }

    fn dispatch(&mut self, in_flight: &mut JoinSet<JobId>, job_id: JobId) {
        if !self.queued.insert(job_id.clone()) {
            trace!("Job {} already queued", job_id);
            return;
        }

        let controller = Arc::clone(&self.controller);
        let permits = Arc::clone(&self.permits);

        in_flight.spawn(async move {
            if let Ok(_permit) = permits.acquire_owned().await {
                match AssertUnwindSafe(controller.process(&job_id))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(ProcessOutcome::Skipped)) => {
                        debug!("Duplicate trigger for {} ignored", job_id)
                    }
                    Ok(Ok(outcome)) => debug!("Job {} finished: {:?}", job_id, outcome),
                    Ok(Err(e)) => error!("Failed to record outcome of job {}: {}", job_id, e),
                    Err(_) => error!("Processing of job {} panicked", job_id),
                }
            }
            job_id
        });
    }

    fn finished(&mut self, joined: Result<JobId, JoinError>) {
        match joined {
            Ok(job_id) => {
                self.queued.remove(&job_id);
            }
            Err(e) => error!("Job task failed: {}", e),
        }
    }
}
