//! HTTP surface for uploads, status polling and downloads

pub mod handlers;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::LibResult;
use crate::job::{JobController, StatusService};

/// Listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Base URL used in `statusUrl`/`downloadUrl`; derived from request
    /// headers when unset
    #[serde(default)]
    pub public_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: None,
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// Shared state of all handlers
pub struct AppState {
    pub controller: Arc<JobController>,
    pub status: StatusService,
    pub public_url: Option<String>,
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/upload", post(handlers::upload))
        .route("/status", get(handlers::status))
        .route("/download", get(handlers::download))
        .route("/process", post(handlers::process))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on `config.bind` until `shutdown` resolves
pub async fn serve(
    config: &ServerConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> LibResult<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("Starting API server on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("API server stopped");
    Ok(())
}
