//! HTTP client for a running sales-rollup server

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::{JobClient, Submission};
use crate::error::{Error, LibResult};
use crate::job::{result_filename, Download, JobId, StatusReport};
use crate::server::types::{ErrorResponse, UploadResponse};

/// Talks to the `/upload`, `/status` and `/download` endpoints
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl JobClient for HttpClient {
    async fn submit(&self, csv_data: &str) -> LibResult<Submission> {
        let response = self
            .http
            .post(self.endpoint("upload"))
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(csv_data.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_else(|_| status.to_string());
            return Err(if status.is_client_error() {
                Error::Validation(message)
            } else {
                Error::HttpStatus(format!("{status}: {message}"))
            });
        }

        let body: UploadResponse = response.json().await?;
        debug!("Upload accepted as {}", body.job_id);
        Ok(Submission {
            job_id: body.job_id,
            status_url: Some(body.status_url),
            download_url: Some(body.download_url),
        })
    }

    async fn status(&self, job_id: &JobId) -> LibResult<StatusReport> {
        let response = self
            .http
            .get(self.endpoint("status"))
            .query(&[("jobId", job_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::HttpStatus(format!(
                "status check failed: {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn download(&self, job_id: &JobId) -> LibResult<Download> {
        let response = self
            .http
            .get(self.endpoint("download"))
            .query(&[("jobId", job_id.as_str())])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Download {
                content: response.text().await?,
                filename: result_filename(job_id),
            }),
            StatusCode::NOT_FOUND => Err(Error::NotFound(format!(
                "Result not found or not ready for {job_id}"
            ))),
            status => Err(Error::HttpStatus(format!("download failed: {status}"))),
        }
    }
}
