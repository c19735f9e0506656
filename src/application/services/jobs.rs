//! Job operations against the job API
//!
//! Thin passthrough for single calls, plus the bulk and summary
//! operations built on top of the job listing.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{ApiBody, ApiRequest, JobHandle, JobStatus, JobSummary};
use crate::infrastructure::traits::JobApi;

/// Per-job result of a bulk terminate/shutdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkResult {
    pub number: u64,
    pub result: Value,
}

/// Per-job failure of a bulk terminate/shutdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkFailure {
    pub number: u64,
    pub error: String,
}

/// Outcome of `terminate_all` / `shutdown_all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub results: Vec<BulkResult>,
    pub errors: Vec<BulkFailure>,
}

/// Service for job API calls.
pub struct JobsService {
    api: Arc<dyn JobApi>,
}

impl JobsService {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }

    /// Issue a single call, passing the remote answer through.
    pub fn call(&self, request: &ApiRequest) -> ApplicationResult<ApiBody> {
        debug!("call: endpoint={}", request.endpoint());
        Ok(self.api.call(request)?)
    }

    /// Current status of one job.
    pub fn status(&self, job: &JobHandle) -> ApplicationResult<JobStatus> {
        let request = ApiRequest::Status(job.clone());
        let body = self.api.call(&request)?;
        extract_status(request.endpoint(), &body)
    }

    /// Active jobs keyed by job number.
    pub fn list_jobs(&self) -> ApplicationResult<BTreeMap<u64, Value>> {
        let request = ApiRequest::Jobs { name: None };
        let body = self.api.call(&request)?;
        let Some(Value::Object(map)) = body.as_json() else {
            return Err(ApplicationError::UnexpectedResponse {
                endpoint: request.endpoint().into(),
                message: "expected a JSON object of jobs".into(),
            });
        };

        let mut jobs = BTreeMap::new();
        for (key, job) in map {
            match key.parse::<u64>() {
                Ok(number) => {
                    jobs.insert(number, job.clone());
                }
                Err(_) => warn!("list_jobs: ignoring non-numeric job key {:?}", key),
            }
        }
        Ok(jobs)
    }

    /// Terminate every active job.
    pub fn terminate_all(&self) -> ApplicationResult<BulkOutcome> {
        self.for_each_job(|number| ApiRequest::Terminate(JobHandle::Number(number)))
    }

    /// Shut down every active job.
    pub fn shutdown_all(&self) -> ApplicationResult<BulkOutcome> {
        self.for_each_job(|number| ApiRequest::Shutdown(JobHandle::Number(number)))
    }

    fn for_each_job(&self, request_for: impl Fn(u64) -> ApiRequest) -> ApplicationResult<BulkOutcome> {
        let jobs = self.list_jobs()?;
        let mut outcome = BulkOutcome::default();
        for number in jobs.keys().copied() {
            match self.api.call(&request_for(number)) {
                Ok(body) => outcome.results.push(BulkResult {
                    number,
                    result: body.into_json(),
                }),
                Err(e) => {
                    warn!("job {}: {}", number, e);
                    outcome.errors.push(BulkFailure {
                        number,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// One condensed line per active job, ordered by job number.
    pub fn summary(&self) -> ApplicationResult<Vec<JobSummary>> {
        let field = |job: &Value, key: &str| {
            job.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Ok(self
            .list_jobs()?
            .into_iter()
            .map(|(number, job)| JobSummary {
                number,
                name: field(&job, "job_name"),
                status: field(&job, "job_status"),
                application: field(&job, "job_application"),
            })
            .collect())
    }
}

/// Pull the job status out of a status response.
///
/// The response is an object keyed by job number; the first job's
/// `job_status` field is used.
pub fn extract_status(endpoint: &str, body: &ApiBody) -> ApplicationResult<JobStatus> {
    let unexpected = |message: &str| ApplicationError::UnexpectedResponse {
        endpoint: endpoint.to_string(),
        message: message.to_string(),
    };
    let job = body
        .as_json()
        .and_then(Value::as_object)
        .and_then(|map| map.values().next())
        .ok_or_else(|| unexpected("no job in status response"))?;
    let status = job
        .get("job_status")
        .and_then(Value::as_str)
        .ok_or_else(|| unexpected("missing job_status"))?;
    Ok(JobStatus::parse(status))
}
