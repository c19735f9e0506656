//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no network, no CLI, no config loading).

pub mod entities;
pub mod error;
pub mod job_spec;
pub mod request;

pub use entities::*;
pub use error::DomainError;
pub use job_spec::resolve_job_spec;
pub use request::{ApiBody, ApiRequest, HttpMethod};
