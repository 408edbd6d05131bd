//! Common test utilities and helpers

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sales_rollup::app::{AppConfig, Pipeline};
use sales_rollup::storage::{JobStore, MemoryBackend};
use tokio::task::JoinHandle;

pub const SCENARIO_A: &str = "Department Name,Date,Number of Sales\n\
Electronics,2023-08-01,100\n\
Clothing,2023-08-01,200\n\
Electronics,2023-08-02,150\n";

pub const SCENARIO_A_RESULT: &str =
    "Department Name,Total Number of Sales\n\"Electronics\",250\n\"Clothing\",200\n";

pub const HEADER_ONLY: &str = "Department Name,Date,Number of Sales\n";

pub const ONE_MALFORMED_ROW: &str = "Department Name,Date,Number of Sales\n\
Toys,2023-08-01,notanumber\n\
Garden,2023-08-01,12\n";

/// Configuration with a fast poller and sweep for tests
pub fn fast_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.poller.interval = Duration::from_millis(10);
    config.poller.max_attempts = 300;
    config.worker.sweep_interval = Duration::from_millis(50);
    config
}

/// Pipeline over a fresh in-memory store
pub fn memory_pipeline(config: &AppConfig) -> Pipeline {
    let store: Arc<dyn JobStore> = Arc::new(MemoryBackend::default());
    Pipeline::with_store(store, config)
}

/// A server running on an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    pub pipeline: Pipeline,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let config = fast_config();
        let pipeline = memory_pipeline(&config);
        let app = sales_rollup::server::router(pipeline.app_state(None));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            pipeline,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn stop(self) {
        self.task.abort();
        self.pipeline.shutdown().await;
    }
}
