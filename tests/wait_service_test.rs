//! Tests for WaitService
//!
//! The job API is scripted: each call pops the next response. The pacer
//! only counts pauses, so no test actually sleeps.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use jarvice::application::services::{PollEvent, WaitOptions, WaitService, MIN_POLL_INTERVAL};
use jarvice::application::ApplicationError;
use jarvice::domain::{ApiBody, ApiRequest, JobHandle, JobStatus};
use jarvice::infrastructure::traits::{JobApi, Pacer};
use jarvice::infrastructure::ApiError;

type Reply = Result<ApiBody, ApiError>;

/// Job API answering from a fixed script, recording every request.
struct ScriptedApi {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedApi {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl JobApi for ScriptedApi {
    fn call(&self, request: &ApiRequest) -> Result<ApiBody, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("job API called more often than scripted")
    }
}

#[derive(Default)]
struct CountingPacer {
    pauses: AtomicU32,
    intervals: Mutex<Vec<Duration>>,
}

impl Pacer for CountingPacer {
    fn pause(&self, interval: Duration) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        self.intervals.lock().unwrap().push(interval);
    }
}

fn status(s: &str) -> Reply {
    Ok(ApiBody::Json(json!({"42": {"job_name": "sim", "job_status": s}})))
}

fn server_error() -> Reply {
    Err(ApiError::Status {
        endpoint: "/jarvice/status".into(),
        code: 503,
        body: "service unavailable".into(),
    })
}

fn unreachable_api() -> Reply {
    Err(ApiError::Transport {
        url: "https://api.jarvice.com/jarvice/status".into(),
        message: "connection refused".into(),
    })
}

fn options() -> WaitOptions {
    WaitOptions {
        interval: Duration::ZERO,
        ..WaitOptions::default()
    }
}

fn service(api: &Arc<ScriptedApi>, pacer: &Arc<CountingPacer>, options: WaitOptions) -> WaitService {
    WaitService::new(api.clone(), pacer.clone(), options)
}

// ============================================================
// terminal detection
// ============================================================

#[test]
fn given_job_completing_on_third_poll_when_waiting_then_polls_exactly_three_times() {
    // Arrange
    let api = ScriptedApi::new(vec![
        status("SUBMITTED"),
        status("PROCESSING"),
        status("COMPLETED"),
    ]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let outcome = service.wait_for(&JobHandle::Number(42)).unwrap();

    // Assert
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.polls, 3);
    assert_eq!(outcome.job, JobHandle::Number(42));
    assert_eq!(api.calls(), 3);
    assert_eq!(pacer.pauses.load(Ordering::SeqCst), 2);
}

#[test]
fn given_already_terminated_job_when_waiting_then_returns_without_pausing() {
    // Arrange
    let api = ScriptedApi::new(vec![status("TERMINATED")]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let outcome = service.wait_for(&JobHandle::Name("sim".into())).unwrap();

    // Assert
    assert_eq!(outcome.status, JobStatus::Terminated);
    assert_eq!(outcome.polls, 1);
    assert_eq!(pacer.pauses.load(Ordering::SeqCst), 0);
}

#[test]
fn given_lowercase_canceled_status_when_waiting_then_terminal() {
    // Arrange
    let api = ScriptedApi::new(vec![status("canceled")]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let outcome = service.wait_for(&JobHandle::Number(42)).unwrap();

    // Assert
    assert_eq!(outcome.status, JobStatus::Canceled);
}

#[test]
fn given_unknown_status_when_waiting_then_keeps_polling() {
    // Arrange
    let api = ScriptedApi::new(vec![
        status("PROCESSING SUSPENDED"),
        status("COMPLETED WITH ERROR"),
    ]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let outcome = service.wait_for(&JobHandle::Number(42)).unwrap();

    // Assert
    assert_eq!(outcome.status, JobStatus::CompletedWithError);
    assert_eq!(outcome.polls, 2);
}

#[test]
fn given_wait_when_polling_then_only_status_endpoint_called() {
    // Arrange
    let api = ScriptedApi::new(vec![status("PROCESSING"), status("COMPLETED")]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    service.wait_for(&JobHandle::Number(42)).unwrap();

    // Assert
    let requests = api.requests.lock().unwrap();
    assert!(requests
        .iter()
        .all(|r| *r == ApiRequest::Status(JobHandle::Number(42))));
}

#[test]
fn given_pending_polls_when_waiting_then_reports_each_to_callback() {
    // Arrange
    let api = ScriptedApi::new(vec![
        status("SUBMITTED"),
        status("PROCESSING STARTING"),
        status("COMPLETED"),
    ]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());
    let mut seen = Vec::new();

    // Act
    service
        .wait_for_with(&JobHandle::Number(42), |event| {
            if let PollEvent::Pending { status, .. } = event {
                seen.push(status.clone());
            }
        })
        .unwrap();

    // Assert
    assert_eq!(seen, vec![JobStatus::Submitted, JobStatus::Starting]);
}

// ============================================================
// failure handling
// ============================================================

#[test]
fn given_persistent_server_errors_when_waiting_then_fails_after_max_errors() {
    // Arrange
    let api = ScriptedApi::new(vec![server_error(), server_error(), server_error()]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let err = service.wait_for(&JobHandle::Number(42)).unwrap_err();

    // Assert
    match err {
        ApplicationError::PollingFailed { attempts, source } => {
            assert_eq!(attempts, 3);
            assert_eq!(source.code(), Some(503));
        }
        other => panic!("expected PollingFailed, got {other:?}"),
    }
    assert_eq!(api.calls(), 3);
}

#[test]
fn given_intermittent_errors_when_waiting_then_counter_resets_on_success() {
    // Arrange: never three failures in a row
    let api = ScriptedApi::new(vec![
        server_error(),
        server_error(),
        status("PROCESSING"),
        unreachable_api(),
        server_error(),
        status("COMPLETED"),
    ]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let outcome = service.wait_for(&JobHandle::Number(42)).unwrap();

    // Assert
    assert_eq!(outcome.status, JobStatus::Completed);
    assert_eq!(outcome.polls, 6);
    assert_eq!(pacer.pauses.load(Ordering::SeqCst), 5);
}

#[test]
fn given_rejected_credentials_when_waiting_then_aborts_without_retry() {
    // Arrange
    let api = ScriptedApi::new(vec![Err(ApiError::Authentication {
        code: 401,
        body: "invalid apikey".into(),
    })]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let err = service.wait_for(&JobHandle::Number(42)).unwrap_err();

    // Assert
    assert!(matches!(
        err,
        ApplicationError::Api(ApiError::Authentication { code: 401, .. })
    ));
    assert_eq!(api.calls(), 1);
    assert_eq!(pacer.pauses.load(Ordering::SeqCst), 0);
}

#[test]
fn given_client_error_when_waiting_then_not_retried() {
    // Arrange
    let api = ScriptedApi::new(vec![Err(ApiError::Status {
        endpoint: "/jarvice/status".into(),
        code: 404,
        body: "no such job".into(),
    })]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let err = service.wait_for(&JobHandle::Number(7)).unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::Api(ApiError::Status { code: 404, .. })));
    assert_eq!(api.calls(), 1);
}

#[test]
fn given_malformed_status_body_when_waiting_then_unexpected_response() {
    // Arrange
    let api = ScriptedApi::new(vec![Ok(ApiBody::Json(json!({})))]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    let err = service.wait_for(&JobHandle::Number(42)).unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::UnexpectedResponse { .. }));
}

#[test]
fn given_zero_timeout_when_job_still_active_then_times_out_after_first_poll() {
    // Arrange
    let api = ScriptedApi::new(vec![status("PROCESSING")]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(
        &api,
        &pacer,
        WaitOptions {
            timeout: Some(Duration::ZERO),
            ..options()
        },
    );

    // Act
    let err = service.wait_for(&JobHandle::Number(42)).unwrap_err();

    // Assert
    match err {
        ApplicationError::WaitTimedOut { job, status, .. } => {
            assert_eq!(job, "42");
            assert_eq!(status, "PROCESSING");
        }
        other => panic!("expected WaitTimedOut, got {other:?}"),
    }
    assert_eq!(api.calls(), 1);
}

#[test]
fn given_zero_max_errors_when_waiting_then_treated_as_one() {
    // Arrange
    let api = ScriptedApi::new(vec![unreachable_api()]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(
        &api,
        &pacer,
        WaitOptions {
            max_consecutive_errors: 0,
            ..options()
        },
    );

    // Act
    let err = service.wait_for(&JobHandle::Number(42)).unwrap_err();

    // Assert
    assert!(matches!(err, ApplicationError::PollingFailed { attempts: 1, .. }));
    assert_eq!(api.calls(), 1);
}

// ============================================================
// pacing
// ============================================================

#[test]
fn given_zero_interval_when_waiting_then_pauses_for_minimum_interval() {
    // Arrange
    let api = ScriptedApi::new(vec![status("PROCESSING"), status("COMPLETED")]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(&api, &pacer, options());

    // Act
    service.wait_for(&JobHandle::Number(42)).unwrap();

    // Assert
    assert_eq!(*pacer.intervals.lock().unwrap(), vec![MIN_POLL_INTERVAL]);
}

#[test]
fn given_timeout_shorter_than_interval_when_waiting_then_pause_capped_by_remaining_time() {
    // Arrange
    let api = ScriptedApi::new(vec![status("PROCESSING"), status("COMPLETED")]);
    let pacer = Arc::new(CountingPacer::default());
    let service = service(
        &api,
        &pacer,
        WaitOptions {
            interval: Duration::from_secs(60),
            timeout: Some(Duration::from_secs(10)),
            ..WaitOptions::default()
        },
    );

    // Act
    service.wait_for(&JobHandle::Number(42)).unwrap();

    // Assert
    let intervals = pacer.intervals.lock().unwrap();
    assert_eq!(intervals.len(), 1);
    assert!(intervals[0] <= Duration::from_secs(10));
    assert!(intervals[0] > Duration::from_secs(9));
}
