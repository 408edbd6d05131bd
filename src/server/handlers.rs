//! Request handlers

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::types::{
    ErrorResponse, JobQuery, ProcessRequest, ProcessResponse, UploadEnvelope, UploadResponse,
};
use super::AppState;
use crate::aggregate::aggregate;
use crate::codec;
use crate::error::Error;
use crate::job::JobId;

/// Maps crate errors onto HTTP responses
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) | Error::Format(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

fn missing_job_id() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("Missing jobId parameter")),
    )
        .into_response()
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let health = state
        .controller
        .store()
        .health_check()
        .await
        .map_err(Error::from)?;
    let code = if health.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((code, Json(health)).into_response())
}

/// `POST /upload`: raw CSV body, or a JSON envelope when sent as JSON
pub async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<UploadResponse>, ApiError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));

    let csv_data = if is_json {
        serde_json::from_str::<UploadEnvelope>(&body)
            .map_err(|e| Error::Validation(format!("Invalid JSON payload: {e}")))?
            .into_csv()
    } else {
        body
    };

    let job_id = state.controller.create(&csv_data).await?;
    let base_url = state
        .public_url
        .clone()
        .unwrap_or_else(|| base_url_from_headers(&headers));
    let base_url = base_url.trim_end_matches('/');

    Ok(Json(UploadResponse {
        success: true,
        message: "CSV uploaded successfully, processing started".to_string(),
        download_url: format!("{base_url}/download?jobId={job_id}"),
        status_url: format!("{base_url}/status?jobId={job_id}"),
        job_id,
    }))
}

/// `GET /status?jobId=`
pub async fn status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> Result<Response, ApiError> {
    let Some(job_id) = query.job_id.filter(|id| !id.is_empty()) else {
        return Ok(missing_job_id());
    };

    let report = state.status.get_status(&JobId::from(job_id)).await?;
    Ok(Json(report).into_response())
}

/// `GET /download?jobId=`
pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobQuery>,
) -> Result<Response, ApiError> {
    let Some(job_id) = query.job_id.filter(|id| !id.is_empty()) else {
        return Ok(missing_job_id());
    };

    let download = state.status.get_download(&JobId::from(job_id)).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", download.filename),
            ),
        ],
        download.content,
    )
        .into_response())
}

/// `POST /process`: aggregate JSON rows synchronously
pub async fn process(Json(request): Json<ProcessRequest>) -> Response {
    let Some(rows) = request.rows() else {
        warn!("Rejected /process request without a row array");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "Invalid data format. Expected array of sales data.",
            )),
        )
            .into_response();
    };

    let totals = aggregate(&rows);
    info!(
        "Processed {} rows into {} departments synchronously",
        rows.len(),
        totals.len()
    );

    Json(ProcessResponse {
        message: "File processed successfully".to_string(),
        csv_data: codec::serialize(&totals),
        download_ready: true,
    })
    .into_response()
}

fn base_url_from_headers(headers: &HeaderMap) -> String {
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_base_url_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.example.com"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        assert_eq!(base_url_from_headers(&headers), "https://api.example.com");

        assert_eq!(base_url_from_headers(&HeaderMap::new()), "http://localhost");
    }

    #[test]
    fn test_error_status_mapping() {
        let response = ApiError(Error::Validation("short".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError(Error::NotFound("job".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = ApiError(Error::Store(crate::storage::StorageError::unavailable(
            "down",
        )))
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
