use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use log::{debug, warn};

use crate::constants::X_MS_CLIENT_REQUEST_ID;
use crate::messages;
use crate::operation::RequestResult;
use crate::retry::RetryContext;
use crate::{
    AttemptContext, Context, Error, LocationSelector, OperationContext, RequestOptions,
    ResponseOutcome, Result, StorageRequest,
};

/// Run `request` to completion, retrying as the options' policy decides.
///
/// `options` must already have the client defaults applied. Attempts are
/// strictly sequential and each one is recorded in `op_ctx`. When the policy
/// gives up, the error of the last attempt is returned.
pub async fn execute<R: StorageRequest>(
    ctx: &Context,
    request: &R,
    options: &RequestOptions,
    op_ctx: &mut OperationContext,
) -> Result<R::Output> {
    let mut selector = LocationSelector::new(
        request.location_mode(),
        options.location_mode(),
        request.storage_uri(),
    )?;
    let mut policy = options.retry_policy().create_instance(op_ctx);
    let client_request_id = op_ctx.client_request_id().to_string();
    let mut retry_count = 0;

    loop {
        let location = selector.current();
        let uri = request
            .storage_uri()
            .get(location)
            .ok_or_else(|| Error::request_invalid(messages::STORAGE_URI_MISSING_LOCATION))?;
        let attempt = AttemptContext::new(location, uri, retry_count, &client_request_id, options);
        let mut result = RequestResult::start(location);

        debug!("request {client_request_id} attempt {retry_count} against {location}: {uri}");

        let outcome = match request.build_request(&attempt) {
            Ok(req) => run_attempt(ctx, request, &attempt, req, &mut result).await,
            Err(err) if policy.retry_build_error(&err) => Err(Failure::Retryable(err)),
            Err(err) => Err(Failure::Fatal(err)),
        };
        let err = match outcome {
            Ok(output) => {
                result.finish();
                op_ctx.push_result(result);
                return Ok(output);
            }
            Err(Failure::Fatal(err)) => {
                result.record_error(&err);
                result.finish();
                op_ctx.push_result(result);
                warn!("request {client_request_id} failed without retry: {err}");
                return Err(err);
            }
            Err(Failure::Retryable(err)) => err,
        };

        result.record_error(&err);
        result.finish();
        let decision = policy.evaluate(&RetryContext::new(
            retry_count,
            &result,
            &err,
            selector.next_location(),
            selector.location_mode(),
        ));
        op_ctx.push_result(result);

        let Some(info) = decision else {
            warn!(
                "request {client_request_id} failed after {} attempts: {err}",
                retry_count + 1
            );
            return Err(err);
        };

        debug!(
            "request {client_request_id} attempt {retry_count} failed with {err}, retrying against {} in {:?}",
            info.target_location(),
            info.retry_interval()
        );
        selector.apply(&info);
        ctx.sleep(info.retry_interval()).await;
        retry_count += 1;
    }
}

/// Why an attempt ended without a value.
enum Failure {
    /// Surfaced as is, the policy is not asked.
    Fatal(Error),
    /// Handed to the retry policy.
    Retryable(Error),
}

/// Sign, send and classify one built request.
async fn run_attempt<R: StorageRequest>(
    ctx: &Context,
    request: &R,
    attempt: &AttemptContext<'_>,
    req: http::Request<Bytes>,
    result: &mut RequestResult,
) -> std::result::Result<R::Output, Failure> {
    let (mut parts, body) = req.into_parts();
    let client_request_id = HeaderValue::from_str(attempt.client_request_id()).map_err(|e| {
        Failure::Fatal(Error::request_invalid("invalid client request id").with_source(e))
    })?;
    parts.headers.insert(
        HeaderName::from_static(X_MS_CLIENT_REQUEST_ID),
        client_request_id,
    );
    request
        .set_headers(&mut parts, attempt)
        .map_err(Failure::Fatal)?;
    request
        .sign_request(ctx, &mut parts, body.len() as u64)
        .await
        .map_err(Failure::Fatal)?;

    let resp = ctx
        .http_send(http::Request::from_parts(parts, body))
        .await
        .map_err(Failure::Retryable)?;
    result.record_response(&resp);
    debug!(
        "request {} attempt {} got {}",
        attempt.client_request_id(),
        attempt.retry_count(),
        resp.status()
    );

    match request.pre_process_response(&resp, attempt) {
        Ok(ResponseOutcome::Success(value)) => request
            .post_process_response(resp, value, attempt)
            .map_err(Failure::Fatal),
        Ok(ResponseOutcome::RetryableFailure) => {
            Err(Failure::Retryable(Error::from_response(&resp)))
        }
        Err(err) => Err(Failure::Retryable(err)),
    }
}
