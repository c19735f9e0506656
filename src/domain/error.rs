//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent invalid user input.
/// They are raised before any network call is made.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid job reference: {0}")]
    InvalidJobHandle(String),

    #[error("invalid job spec: {message}")]
    InvalidJobSpec { message: String },

    #[error("missing credential: {0} (pass --{0}, set JARVICE_{upper} or add it to the config file)", upper = .0.to_uppercase())]
    MissingCredential(&'static str),

    #[error("invalid vault address: {0}")]
    InvalidVaultAddress(String),
}
