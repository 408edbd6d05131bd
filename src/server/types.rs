//! Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::SalesRow;
use crate::job::JobId;

/// JSON envelope accepted by `POST /upload`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEnvelope {
    #[serde(default)]
    pub csv_data: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

impl UploadEnvelope {
    pub fn into_csv(self) -> String {
        self.csv_data.or(self.data).unwrap_or_default()
    }
}

/// Successful `POST /upload` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub job_id: JobId,
    pub message: String,
    pub download_url: String,
    pub status_url: String,
}

/// Error body shared by all JSON endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// `jobId` query parameter of `/status` and `/download`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobQuery {
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

/// Body of the synchronous `POST /process` endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub data: Option<Value>,
}

impl ProcessRequest {
    /// Usable rows carried in `data`, `None` unless it is an array.
    ///
    /// Elements without a department or an integer sales count are dropped
    /// one by one; `date` is optional.
    pub fn rows(self) -> Option<Vec<SalesRow>> {
        match self.data? {
            Value::Array(items) => Some(items.iter().filter_map(row_from_value).collect()),
            _ => None,
        }
    }
}

fn row_from_value(item: &Value) -> Option<SalesRow> {
    let department_name = item.get("departmentName")?.as_str()?.trim();
    if department_name.is_empty() {
        return None;
    }

    let number_of_sales = match item.get("numberOfSales")? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    Some(SalesRow {
        department_name: department_name.to_string(),
        date: item
            .get("date")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        number_of_sales,
    })
}

/// Response of `POST /process`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub message: String,
    pub csv_data: String,
    pub download_ready: bool,
}
