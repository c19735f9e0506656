//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::domain::DomainError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("{0}")]
    Usage(String),

    #[error("{failed} of {total} job(s) failed")]
    BatchFailed { failed: usize, total: usize },
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

impl From<DomainError> for CliError {
    fn from(e: DomainError) -> Self {
        ApplicationError::Domain(e).into()
    }
}

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        crate::exitcode::FAILURE
    }

    /// Errors that are neither user input, authentication, transfer nor
    /// communication problems.
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            CliError::Infra(InfraError::Application(
                ApplicationError::UnexpectedResponse { .. } | ApplicationError::OperationFailed { .. }
            ))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::TransferError;

    #[test]
    fn given_unexpected_response_when_classifying_then_unexpected() {
        let err = CliError::from(ApplicationError::UnexpectedResponse {
            endpoint: "/jarvice/status".into(),
            message: "no job object".into(),
        });
        assert!(err.is_unexpected());
    }

    #[test]
    fn given_transfer_or_input_error_when_classifying_then_expected() {
        let transfer = CliError::from(ApplicationError::from(TransferError::RemoteNotFound(
            "a.txt".into(),
        )));
        let usage = CliError::Usage("command does not talk to the job API".into());
        assert!(!transfer.is_unexpected());
        assert!(!usage.is_unexpected());
        assert_eq!(usage.exit_code(), 1);
    }
}
