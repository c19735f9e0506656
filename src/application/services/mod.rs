//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (JobApi, RemoteFs, Pacer)
//! but are themselves concrete structs, not traits.

mod jobs;
mod transfer;
mod wait;

pub use jobs::{extract_status, BulkFailure, BulkOutcome, BulkResult, JobsService};
pub use transfer::{
    normalize_remote, remote_basename, remote_join, remote_parent, TransferResult,
    TransferService, PART_SUFFIX,
};
pub use wait::{PollEvent, MIN_POLL_INTERVAL, WaitOptions, WaitOutcome, WaitService};
