//! Infrastructure-level errors (wraps application errors)

use thiserror::Error;

use crate::application::ApplicationError;

/// Errors reported by the job API gateway.
///
/// Remote bodies are kept verbatim so they can be shown to the user unmodified.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication rejected (HTTP {code}): {body}")]
    Authentication { code: u16, body: String },

    #[error("API call {endpoint} failed (HTTP {code}): {body}")]
    Status {
        endpoint: String,
        code: u16,
        body: String,
    },

    #[error("cannot reach job API at {url}: {message}")]
    Transport { url: String, message: String },

    #[error("unknown content type ({content_type}) from {endpoint}")]
    ContentType {
        endpoint: String,
        content_type: String,
    },

    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

impl ApiError {
    /// Network-level and server-side failures that may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Status { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// HTTP status code, when the remote answered at all.
    pub fn code(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { code, .. } | ApiError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Infrastructure errors wrap application errors and add vault session failures.
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("{0}")]
    Application(#[from] ApplicationError),

    #[error("vault session failed ({address}): {message}")]
    Vault { address: String, message: String },

    #[error("vault authentication failed for {username}@{address}")]
    VaultAuthentication { username: String, address: String },
}

impl From<ApiError> for InfraError {
    fn from(e: ApiError) -> Self {
        InfraError::Application(ApplicationError::Api(e))
    }
}

/// Result type for infrastructure layer operations.
pub type InfraResult<T> = Result<T, InfraError>;
