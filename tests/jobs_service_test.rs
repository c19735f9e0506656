//! Tests for JobsService: passthrough, bulk operations and summary

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use jarvice::application::services::JobsService;
use jarvice::application::ApplicationError;
use jarvice::domain::{ApiBody, ApiRequest, JobHandle, JobStatus};
use jarvice::infrastructure::traits::JobApi;
use jarvice::infrastructure::ApiError;

/// Job API answering through a closure, recording every request.
struct FakeApi<F> {
    answer: F,
    requests: Mutex<Vec<ApiRequest>>,
}

impl<F> FakeApi<F>
where
    F: Fn(&ApiRequest) -> Result<ApiBody, ApiError> + Send + Sync,
{
    fn new(answer: F) -> Arc<Self> {
        Arc::new(Self {
            answer,
            requests: Mutex::new(Vec::new()),
        })
    }
}

impl<F> JobApi for FakeApi<F>
where
    F: Fn(&ApiRequest) -> Result<ApiBody, ApiError> + Send + Sync,
{
    fn call(&self, request: &ApiRequest) -> Result<ApiBody, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.answer)(request)
    }
}

fn active_jobs() -> Value {
    json!({
        "20": {"job_name": "b", "job_status": "SUBMITTED", "job_application": "sim"},
        "3": {"job_name": "a", "job_status": "PROCESSING", "job_application": "solver"},
        "7": {"job_name": "c", "job_status": "PROCESSING STARTING", "job_application": "sim"}
    })
}

#[test]
fn given_active_jobs_when_terminate_all_then_one_terminate_per_job() {
    // Arrange
    let api = FakeApi::new(|request| match request {
        ApiRequest::Jobs { .. } => Ok(ApiBody::Json(active_jobs())),
        ApiRequest::Terminate(JobHandle::Number(n)) => Ok(ApiBody::Json(json!({"status": n}))),
        other => panic!("unexpected request {other:?}"),
    });
    let service = JobsService::new(api.clone());

    // Act
    let outcome = service.terminate_all().unwrap();

    // Assert
    let numbers: Vec<u64> = outcome.results.iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![3, 7, 20]);
    assert!(outcome.errors.is_empty());
    assert_eq!(api.requests.lock().unwrap().len(), 4);
}

#[test]
fn given_one_failing_job_when_shutdown_all_then_batch_continues_and_collects_error() {
    // Arrange
    let api = FakeApi::new(|request| match request {
        ApiRequest::Jobs { .. } => Ok(ApiBody::Json(active_jobs())),
        ApiRequest::Shutdown(JobHandle::Number(7)) => Err(ApiError::Status {
            endpoint: "/jarvice/shutdown".into(),
            code: 400,
            body: "job 7 is not running".into(),
        }),
        ApiRequest::Shutdown(_) => Ok(ApiBody::Json(json!({"status": "shutdown requested"}))),
        other => panic!("unexpected request {other:?}"),
    });
    let service = JobsService::new(api);

    // Act
    let outcome = service.shutdown_all().unwrap();

    // Assert
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].number, 7);
    assert!(outcome.errors[0].error.contains("job 7 is not running"));
}

#[test]
fn given_no_active_jobs_when_terminate_all_then_empty_outcome() {
    // Arrange
    let api = FakeApi::new(|request| match request {
        ApiRequest::Jobs { .. } => Ok(ApiBody::Json(json!({}))),
        other => panic!("unexpected request {other:?}"),
    });
    let service = JobsService::new(api);

    // Act
    let outcome = service.terminate_all().unwrap();

    // Assert
    assert!(outcome.results.is_empty());
    assert!(outcome.errors.is_empty());
}

#[test]
fn given_active_jobs_when_summary_then_condensed_and_sorted_by_number() {
    // Arrange
    let api = FakeApi::new(|_| Ok(ApiBody::Json(active_jobs())));
    let service = JobsService::new(api);

    // Act
    let summary = service.summary().unwrap();

    // Assert
    assert_eq!(summary.len(), 3);
    assert_eq!(summary[0].number, 3);
    assert_eq!(summary[0].name, "a");
    assert_eq!(summary[0].status, "PROCESSING");
    assert_eq!(summary[0].application, "solver");
    assert_eq!(summary[2].number, 20);
}

#[test]
fn given_text_jobs_body_when_listing_then_unexpected_response() {
    // Arrange
    let api = FakeApi::new(|_| Ok(ApiBody::Text("maintenance".into())));
    let service = JobsService::new(api);

    // Act
    let err = service.list_jobs().unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::UnexpectedResponse { .. }));
}

#[test]
fn given_rejected_credentials_when_calling_then_error_passed_through_verbatim() {
    // Arrange
    let api = FakeApi::new(|_| {
        Err(ApiError::Authentication {
            code: 401,
            body: "Invalid username or API key".into(),
        })
    });
    let service = JobsService::new(api);

    // Act
    let err = service.call(&ApiRequest::Jobs { name: None }).unwrap_err();

    // Assert
    assert!(err.to_string().contains("Invalid username or API key"));
}

#[test]
fn given_status_response_when_querying_status_then_parsed() {
    // Arrange
    let api = FakeApi::new(|_| {
        Ok(ApiBody::Json(
            json!({"11": {"job_status": "COMPLETED WITH ERROR"}}),
        ))
    });
    let service = JobsService::new(api);

    // Act
    let status = service.status(&JobHandle::Number(11)).unwrap();

    // Assert
    assert_eq!(status, JobStatus::CompletedWithError);
    assert!(status.is_terminal());
}
