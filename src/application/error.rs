//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::ApiError;

/// Failures of a vault transfer, distinguishable by kind.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("local path does not exist: {0}")]
    LocalNotFound(PathBuf),

    #[error("remote path does not exist: {0}")]
    RemoteNotFound(String),

    #[error("remote path exists, refusing to overwrite: {0} (use --overwrite)")]
    WouldOverwrite(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("local path is not a regular file or directory: {0}")]
    UnsupportedLocalType(PathBuf),

    #[error("remote path exists but is not a recognized type: {0}")]
    UnsupportedRemoteType(String),

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transfer aborted at {failed} after {completed} completed file(s): {source}")]
    Aborted {
        failed: String,
        completed: usize,
        #[source]
        source: Box<TransferError>,
    },
}

impl TransferError {
    /// Classify an I/O failure on `path`.
    pub fn io(action: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => TransferError::PermissionDenied(path),
            _ => TransferError::Io {
                action,
                path,
                source,
            },
        }
    }

    /// The underlying error, looking through `Aborted`.
    pub fn root(&self) -> &TransferError {
        match self {
            TransferError::Aborted { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("could not query job status after {attempts} consecutive failures: {source}")]
    PollingFailed {
        attempts: u32,
        #[source]
        source: ApiError,
    },

    #[error("job {job} still {status} after {}s", .waited.as_secs())]
    WaitTimedOut {
        job: String,
        status: String,
        waited: Duration,
    },

    #[error("unexpected response from {endpoint}: {message}")]
    UnexpectedResponse { endpoint: String, message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
