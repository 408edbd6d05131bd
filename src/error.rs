use thiserror::Error;

use crate::codec::FormatError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum Error {
    /// Submission rejected before a job was created
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Store error: {0}")]
    Store(#[from] StorageError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP status error: {0}")]
    HttpStatus(String),
}

impl Error {
    /// Process exit code used by the CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Validation(_) | Error::Format(_) => 2,
            Error::NotFound(_) => 3,
            Error::Config(_) | Error::Yaml(_) => 4,
            _ => 1,
        }
    }

    /// Whether the caller sent a bad request (4xx-equivalent)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Format(_) | Error::NotFound(_)
        )
    }
}

pub type LibResult<T> = std::result::Result<T, Error>;
