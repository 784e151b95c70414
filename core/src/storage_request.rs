use bytes::Bytes;
use http::Uri;

use crate::constants::QUERY_TIMEOUT;
use crate::request::QUERY_ENCODE_SET;
use crate::{Context, RequestLocationMode, RequestOptions, Result, StorageLocation, StorageUri};

/// How the response of one attempt should be treated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseOutcome<T> {
    /// The attempt succeeded with this value.
    Success(T),
    /// The attempt failed in a way the retry policy may retry.
    ///
    /// The engine turns the response into a service error carrying its
    /// status and error code.
    RetryableFailure,
}

/// What a descriptor knows about the attempt it builds or interprets.
#[derive(Debug, Clone, Copy)]
pub struct AttemptContext<'a> {
    location: StorageLocation,
    uri: &'a Uri,
    retry_count: u32,
    client_request_id: &'a str,
    options: &'a RequestOptions,
}

impl<'a> AttemptContext<'a> {
    pub(crate) fn new(
        location: StorageLocation,
        uri: &'a Uri,
        retry_count: u32,
        client_request_id: &'a str,
        options: &'a RequestOptions,
    ) -> Self {
        Self {
            location,
            uri,
            retry_count,
            client_request_id,
            options,
        }
    }

    /// Location this attempt targets.
    pub fn location(&self) -> StorageLocation {
        self.location
    }

    /// Resource uri at [`AttemptContext::location`].
    pub fn uri(&self) -> &'a Uri {
        self.uri
    }

    /// `0` for the first attempt.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Client request id of the call.
    pub fn client_request_id(&self) -> &'a str {
        self.client_request_id
    }

    /// Options of the call, defaults already applied.
    pub fn options(&self) -> &'a RequestOptions {
        self.options
    }

    /// [`AttemptContext::uri`] with `query` appended.
    ///
    /// Values are percent encoded. The `timeout` parameter is added when the
    /// options carry a server timeout.
    pub fn request_uri(&self, query: &[(&str, &str)]) -> Result<Uri> {
        let timeout = self
            .options
            .timeout()
            .map(|t| t.as_secs().max(1).to_string());
        let pairs = query
            .iter()
            .copied()
            .chain(timeout.as_deref().map(|t| (QUERY_TIMEOUT, t)));

        let mut paq = self.uri.path().to_string();
        let mut sep = match self.uri.query() {
            Some(q) => {
                paq.push('?');
                paq.push_str(q);
                '&'
            }
            None => '?',
        };
        for (k, v) in pairs {
            paq.push(sep);
            sep = '&';
            paq.push_str(k);
            if !v.is_empty() {
                paq.push('=');
                paq.extend(percent_encoding::utf8_percent_encode(v, &QUERY_ENCODE_SET));
            }
        }

        let mut parts = self.uri.clone().into_parts();
        parts.path_and_query = Some(paq.parse()?);
        Ok(Uri::from_parts(parts)?)
    }
}

/// One storage operation, described to the execution engine.
///
/// Every attempt the engine makes goes through these hooks in order:
/// [`build_request`](StorageRequest::build_request),
/// [`set_headers`](StorageRequest::set_headers),
/// [`sign_request`](StorageRequest::sign_request), send,
/// [`pre_process_response`](StorageRequest::pre_process_response) and, on
/// success only, [`post_process_response`](StorageRequest::post_process_response).
/// A descriptor is stateless across attempts; everything that changes between
/// attempts is in the [`AttemptContext`].
#[async_trait::async_trait]
pub trait StorageRequest: Send + Sync {
    /// Value produced by a successful call.
    type Output: Send;

    /// Endpoints of the resource this operation addresses.
    fn storage_uri(&self) -> &StorageUri;

    /// Locations this operation may run against.
    fn location_mode(&self) -> RequestLocationMode {
        RequestLocationMode::PrimaryOnly
    }

    /// Build the request for this attempt, bound to `attempt.uri()`.
    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>>;

    /// Add operation specific headers before signing.
    fn set_headers(&self, _parts: &mut http::request::Parts, _: &AttemptContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Authorize the request. Unsigned by default.
    async fn sign_request(
        &self,
        _ctx: &Context,
        _parts: &mut http::request::Parts,
        _content_length: u64,
    ) -> Result<()> {
        Ok(())
    }

    /// Classify the response.
    ///
    /// Returning `Err` is treated like a retryable failure: the retry policy
    /// decides whether another attempt is made.
    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        attempt: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>>;

    /// Finish a successful response, for example by parsing its body.
    ///
    /// Errors here are never retried.
    fn post_process_response(
        &self,
        _resp: http::Response<Bytes>,
        value: Self::Output,
        _: &AttemptContext<'_>,
    ) -> Result<Self::Output> {
        Ok(value)
    }
}
