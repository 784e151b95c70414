use std::time::Instant;

use chrono::{DateTime, Utc};
use http::StatusCode;

use crate::StorageLocation;

/// Per-call record of what the execution engine did.
///
/// An `OperationContext` is owned by exactly one logical call (or one lazy
/// listing). It carries the client request id stamped on every attempt and
/// collects one [`RequestResult`] per attempt.
#[derive(Debug, Clone)]
pub struct OperationContext {
    client_request_id: String,
    request_results: Vec<RequestResult>,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationContext {
    /// Create a context with a random client request id.
    pub fn new() -> Self {
        Self {
            client_request_id: uuid::Uuid::new_v4().to_string(),
            request_results: Vec::new(),
        }
    }

    /// Use a caller provided client request id instead of a random one.
    pub fn with_client_request_id(mut self, id: impl Into<String>) -> Self {
        self.client_request_id = id.into();
        self
    }

    /// Id sent as `x-ms-client-request-id` on every attempt.
    pub fn client_request_id(&self) -> &str {
        &self.client_request_id
    }

    /// All attempts made so far, oldest first.
    pub fn request_results(&self) -> &[RequestResult] {
        &self.request_results
    }

    /// The most recent attempt.
    pub fn last_result(&self) -> Option<&RequestResult> {
        self.request_results.last()
    }

    pub(crate) fn push_result(&mut self, result: RequestResult) {
        self.request_results.push(result);
    }
}

/// Outcome of a single attempt.
#[derive(Debug, Clone)]
pub struct RequestResult {
    /// Endpoint the attempt targeted.
    pub target_location: StorageLocation,
    /// Wall clock time the attempt started.
    pub start_time: DateTime<Utc>,
    /// Wall clock time the attempt finished.
    pub stop_time: Option<DateTime<Utc>>,
    /// Monotonic finish time, used to space retries per location.
    pub finished_at: Option<Instant>,
    /// HTTP status, absent when no response arrived.
    pub status: Option<StatusCode>,
    /// `x-ms-request-id` returned by the service.
    pub service_request_id: Option<String>,
    /// `ETag` returned by the service.
    pub etag: Option<String>,
    /// Service error code of a failed attempt.
    pub error_code: Option<String>,
    /// Message of the error that failed the attempt.
    pub error_message: Option<String>,
}

impl RequestResult {
    pub(crate) fn start(target_location: StorageLocation) -> Self {
        Self {
            target_location,
            start_time: Utc::now(),
            stop_time: None,
            finished_at: None,
            status: None,
            service_request_id: None,
            etag: None,
            error_code: None,
            error_message: None,
        }
    }

    pub(crate) fn record_response<B>(&mut self, resp: &http::Response<B>) {
        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        };

        self.status = Some(resp.status());
        self.service_request_id = header(crate::constants::X_MS_REQUEST_ID);
        self.etag = header(http::header::ETAG.as_str());
    }

    pub(crate) fn record_error(&mut self, err: &crate::Error) {
        if self.status.is_none() {
            self.status = err.status();
        }
        self.error_code = err.error_code().map(|v| v.to_string());
        self.error_message = Some(err.to_string());
    }

    pub(crate) fn finish(&mut self) {
        self.stop_time = Some(Utc::now());
        self.finished_at = Some(Instant::now());
    }

    /// A finished result that only carries a status.
    ///
    /// Handy for driving a [`RetryPolicy`](crate::retry::RetryPolicy) outside the engine.
    pub fn with_status(target_location: StorageLocation, status: Option<StatusCode>) -> Self {
        let mut result = Self::start(target_location);
        result.status = status;
        result.finish();
        result
    }
}
