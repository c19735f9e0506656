//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod api;
pub mod di;
pub mod error;
pub mod traits;
pub mod vault;

pub use error::{ApiError, InfraError, InfraResult};
