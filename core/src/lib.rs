//! Core components for running Azure Storage operations.
//!
//! This crate holds the parts every storage service binding shares: the
//! execution engine that sends, classifies and retries requests, the retry
//! policies, primary/secondary location selection and continuation of
//! segmented listings.
//!
//! ## Overview
//!
//! - **Context**: the runtime pieces the engine needs (HTTP client, timer,
//!   environment). azstore-core ships no implementation of them.
//! - **StorageRequest**: a descriptor for one operation. It builds, signs and
//!   interprets the request of each attempt.
//! - **execute**: runs a descriptor to completion under a retry policy.
//! - **lazy_segmented**: turns a page fetcher into a lazy stream of items.
//!
//! ## Example
//!
//! ```no_run
//! use azstore_core::{
//!     execute, AttemptContext, Context, OperationContext, RequestLocationMode, RequestOptions,
//!     ResponseOutcome, Result, StorageRequest, StorageUri,
//! };
//! use bytes::Bytes;
//!
//! #[derive(Debug)]
//! struct GetProperties {
//!     uri: StorageUri,
//! }
//!
//! #[async_trait::async_trait]
//! impl StorageRequest for GetProperties {
//!     type Output = Option<String>;
//!
//!     fn storage_uri(&self) -> &StorageUri {
//!         &self.uri
//!     }
//!
//!     fn location_mode(&self) -> RequestLocationMode {
//!         RequestLocationMode::PrimaryOrSecondary
//!     }
//!
//!     fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
//!         let uri = attempt.request_uri(&[("restype", "container")])?;
//!         Ok(http::Request::head(uri).body(Bytes::new())?)
//!     }
//!
//!     fn pre_process_response(
//!         &self,
//!         resp: &http::Response<Bytes>,
//!         _: &AttemptContext<'_>,
//!     ) -> Result<ResponseOutcome<Self::Output>> {
//!         if !resp.status().is_success() {
//!             return Ok(ResponseOutcome::RetryableFailure);
//!         }
//!         let etag = resp.headers().get(http::header::ETAG);
//!         Ok(ResponseOutcome::Success(
//!             etag.and_then(|v| v.to_str().ok()).map(|v| v.to_string()),
//!         ))
//!     }
//! }
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let request = GetProperties {
//!     uri: StorageUri::parse("https://acct.blob.core.windows.net/c1", None)?,
//! };
//! let mut op_ctx = OperationContext::new();
//! let etag = execute(&ctx, &request, &RequestOptions::new(), &mut op_ctx).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Utilities
//!
//! - [`hash`]: Shared Key hashing helpers
//! - [`messages`]: user facing error messages
//! - [`retry`]: retry policies
//! - [`time`]: Time manipulation utilities
//! - [`utils`]: General utilities including data redaction

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod messages;
pub mod retry;
pub mod time;
pub mod utils;

mod constants;

mod context;
pub use context::{
    Context, Env, HttpSend, NoopEnv, NoopHttpSend, NoopSleep, OsEnv, Sleep, StaticEnv,
};
mod error;
pub use error::{Error, ErrorKind, Result};

mod location;
pub use location::{
    LocationMode, LocationSelector, RequestLocationMode, StorageLocation, StorageUri,
};
mod operation;
pub use operation::{OperationContext, RequestResult};
mod options;
pub use options::RequestOptions;
mod continuation;
pub use continuation::{ContinuationKind, ContinuationToken, ResultSegment, SegmentedRequest};
mod segmented;
pub use segmented::lazy_segmented;

mod request;
pub use request::{SigningRequest, QUERY_ENCODE_SET};
mod sign;
pub use sign::SignRequest;
mod storage_request;
pub use storage_request::{AttemptContext, ResponseOutcome, StorageRequest};
mod executor;
pub use executor::execute;
