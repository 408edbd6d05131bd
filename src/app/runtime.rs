//! Runtime wiring
//!
//! Builds the job store from configuration and connects the controller,
//! status service and dispatcher that every entry point shares.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::app::config::AppConfig;
use crate::client::{LocalClient, Poller};
use crate::error::LibResult;
use crate::job::{JobController, StatusService};
use crate::server::AppState;
use crate::storage::{JobStore, StorageFactory};
use crate::worker::{Dispatcher, DispatcherHandle};

/// A running job pipeline
pub struct Pipeline {
    pub store: Arc<dyn JobStore>,
    pub controller: Arc<JobController>,
    pub status: StatusService,
    dispatcher: DispatcherHandle,
}

/// Create the store and start the dispatcher
pub async fn start_pipeline(config: &AppConfig) -> LibResult<Pipeline> {
    let store = StorageFactory::from_config(&config.storage).await?;
    debug!("Job store ready ({:?})", config.storage.backend);

    Ok(Pipeline::with_store(store, config))
}

impl Pipeline {
    /// Wire a pipeline around an existing store
    pub fn with_store(store: Arc<dyn JobStore>, config: &AppConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = Arc::new(
            JobController::new(store.clone())
                .with_min_csv_length(config.validation.min_csv_length)
                .with_notifier(tx),
        );
        let status = StatusService::new(store.clone());
        let dispatcher = Dispatcher::new(controller.clone(), rx, &config.worker).spawn();

        Self {
            store,
            controller,
            status,
            dispatcher,
        }
    }

    /// In-process client over this pipeline
    pub fn local_client(&self) -> LocalClient {
        LocalClient::new(self.controller.clone(), self.status.clone())
    }

    /// Poller over the in-process client
    pub fn local_poller(&self, config: &AppConfig) -> Poller<LocalClient> {
        Poller::new(self.local_client(), config.poller.clone())
    }

    /// Shared state for the HTTP handlers
    pub fn app_state(&self, public_url: Option<String>) -> Arc<AppState> {
        Arc::new(AppState {
            controller: self.controller.clone(),
            status: self.status.clone(),
            public_url,
        })
    }

    /// Stop the dispatcher once in-flight jobs finish
    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
        info!("Pipeline shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::PollOutcome;
    use std::time::Duration;

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.poller.interval = Duration::from_millis(10);
        config.poller.max_attempts = 200;
        config
    }

    #[tokio::test]
    async fn test_pipeline_processes_submitted_csv() {
        let config = fast_config();
        let pipeline = start_pipeline(&config).await.unwrap();
        let poller = pipeline.local_poller(&config);

        let outcome = poller
            .run("Department Name,Date,Number of Sales\nToys,2023-08-01,3\nToys,2023-08-02,4\n")
            .await
            .unwrap();

        match outcome {
            PollOutcome::Completed { download, .. } => {
                assert_eq!(
                    download.content,
                    "Department Name,Total Number of Sales\n\"Toys\",7\n"
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_app_state_shares_controller() {
        let config = fast_config();
        let pipeline = start_pipeline(&config).await.unwrap();
        let state = pipeline.app_state(Some("http://example.test".into()));
        assert!(Arc::ptr_eq(&state.controller, &pipeline.controller));
        assert_eq!(state.public_url.as_deref(), Some("http://example.test"));
        pipeline.shutdown().await;
    }
}
