//! Job wait primitive
//!
//! Polls the status endpoint until the job reaches a terminal status.
//! Read-only: the job itself is never touched.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use super::jobs::extract_status;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ApiRequest, JobHandle, JobStatus};
use crate::infrastructure::traits::{JobApi, Pacer};
use crate::infrastructure::ApiError;

/// Shortest pause between two status queries.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pacing and failure bounds for [`WaitService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOptions {
    /// Delay between two status queries (at least [`MIN_POLL_INTERVAL`])
    pub interval: Duration,
    /// Consecutive transient failures tolerated before giving up (at least 1)
    pub max_consecutive_errors: u32,
    /// Give up if the job is still active after this long
    pub timeout: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_consecutive_errors: 3,
            timeout: None,
        }
    }
}

/// Progress notifications emitted between polls.
#[derive(Debug)]
pub enum PollEvent<'a> {
    /// The job is still active.
    Pending { poll: u32, status: &'a JobStatus },
    /// A status query failed and will be retried.
    Retrying { attempt: u32, error: &'a ApiError },
}

/// Final state of a waited-for job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitOutcome {
    pub job: JobHandle,
    pub status: JobStatus,
    /// Number of status queries issued, failed ones included
    pub polls: u32,
}

pub struct WaitService {
    api: Arc<dyn JobApi>,
    pacer: Arc<dyn Pacer>,
    options: WaitOptions,
}

impl WaitService {
    pub fn new(api: Arc<dyn JobApi>, pacer: Arc<dyn Pacer>, options: WaitOptions) -> Self {
        Self {
            api,
            pacer,
            options,
        }
    }

    /// Block until `job` reaches a terminal status.
    pub fn wait_for(&self, job: &JobHandle) -> ApplicationResult<WaitOutcome> {
        self.wait_for_with(job, |_| {})
    }

    /// Like [`wait_for`](Self::wait_for), reporting each non-terminal poll to `on_event`.
    #[instrument(skip(self, on_event))]
    pub fn wait_for_with(
        &self,
        job: &JobHandle,
        mut on_event: impl FnMut(PollEvent<'_>),
    ) -> ApplicationResult<WaitOutcome> {
        let request = ApiRequest::Status(job.clone());
        let max_errors = self.options.max_consecutive_errors.max(1);
        let interval = self.options.interval.max(MIN_POLL_INTERVAL);
        let started = Instant::now();
        let mut polls = 0u32;
        let mut failures = 0u32;
        let mut last_status: Option<JobStatus> = None;

        loop {
            polls += 1;
            match self.api.call(&request) {
                Ok(body) => {
                    failures = 0;
                    let status = extract_status(request.endpoint(), &body)?;
                    debug!("poll {}: job {} is {}", polls, job, status);
                    if status.is_terminal() {
                        return Ok(WaitOutcome {
                            job: job.clone(),
                            status,
                            polls,
                        });
                    }
                    on_event(PollEvent::Pending {
                        poll: polls,
                        status: &status,
                    });
                    last_status = Some(status);
                }
                Err(e) if e.is_transient() => {
                    failures += 1;
                    if failures >= max_errors {
                        return Err(ApplicationError::PollingFailed {
                            attempts: failures,
                            source: e,
                        });
                    }
                    warn!(
                        "status query failed ({}/{}), retrying: {}",
                        failures, max_errors, e
                    );
                    on_event(PollEvent::Retrying {
                        attempt: failures,
                        error: &e,
                    });
                }
                Err(e) => return Err(e.into()),
            }

            let pause = match self.options.timeout {
                Some(timeout) => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(ApplicationError::WaitTimedOut {
                            job: job.to_string(),
                            status: last_status
                                .as_ref()
                                .map(JobStatus::to_string)
                                .unwrap_or_else(|| "unknown".into()),
                            waited,
                        });
                    }
                    interval.min(timeout - waited)
                }
                None => interval,
            };
            self.pacer.pause(pause);
        }
    }
}
