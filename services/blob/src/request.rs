//! Descriptors of the blob service operations.
//!
//! Every descriptor borrows what it needs from the entity that runs it and
//! stays valid for all attempts of one call.

use std::collections::HashMap;

use async_trait::async_trait;
use azstore_core::{
    AttemptContext, ContinuationKind, ContinuationToken, Context, RequestLocationMode,
    ResponseOutcome, Result, ResultSegment, SignRequest, StorageRequest, StorageUri,
};
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderName, HeaderValue, Method, StatusCode};

use crate::constants::*;
use crate::response::{
    BlobList, ContainerAttributes, ContainerItem, ContainerList, ContainerProperties,
    LeaseResponse, ListBlobItem, PublicAccess,
};
use crate::{AccessCondition, BlobContainerPermissions, RequestSigner};

/// Extra data a blob listing can carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlobListingDetails {
    /// Include snapshots. Only valid for flat listings.
    pub snapshots: bool,
    /// Include user metadata.
    pub metadata: bool,
    /// Include uncommitted blobs.
    pub uncommitted_blobs: bool,
    /// Include copy properties.
    pub copy: bool,
}

impl BlobListingDetails {
    /// Value of the `include` query parameter, `None` when nothing is asked.
    fn include(&self) -> Option<String> {
        let values = [
            (self.snapshots, "snapshots"),
            (self.metadata, "metadata"),
            (self.uncommitted_blobs, "uncommittedblobs"),
            (self.copy, "copy"),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .map(|(_, v)| v)
        .collect::<Vec<_>>();

        (!values.is_empty()).then(|| values.join(","))
    }
}

/// What every blob request shares: the resource it addresses and how it is
/// signed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub uri: &'a StorageUri,
    pub signer: &'a RequestSigner,
}

impl Target<'_> {
    fn build(
        &self,
        method: Method,
        attempt: &AttemptContext<'_>,
        query: &[(&str, &str)],
    ) -> Result<http::Request<Bytes>> {
        self.build_with_body(method, attempt, query, Bytes::new())
    }

    fn build_with_body(
        &self,
        method: Method,
        attempt: &AttemptContext<'_>,
        query: &[(&str, &str)],
        body: Bytes,
    ) -> Result<http::Request<Bytes>> {
        Ok(http::Request::builder()
            .method(method)
            .uri(attempt.request_uri(query)?)
            .body(body)?)
    }

    fn stamp_version(&self, parts: &mut Parts) {
        parts
            .headers
            .insert(X_MS_VERSION, HeaderValue::from_static(STORAGE_VERSION));
    }

    async fn sign(&self, ctx: &Context, parts: &mut Parts, content_length: u64) -> Result<()> {
        self.signer.sign_request(ctx, parts, content_length).await
    }
}

fn set_metadata(parts: &mut Parts, metadata: &HashMap<String, String>) -> Result<()> {
    for (k, v) in metadata {
        let name = HeaderName::try_from(format!("{X_MS_META_PREFIX}{k}"))?;
        parts.headers.insert(name, v.parse()?);
    }
    Ok(())
}

fn set_condition(parts: &mut Parts, condition: Option<&AccessCondition>) -> Result<()> {
    match condition {
        Some(condition) => condition.apply(parts),
        None => Ok(()),
    }
}

fn expect_status<T>(
    resp: &http::Response<Bytes>,
    expected: StatusCode,
    value: impl FnOnce() -> Result<T>,
) -> Result<ResponseOutcome<T>> {
    if resp.status() != expected {
        return Ok(ResponseOutcome::RetryableFailure);
    }
    Ok(ResponseOutcome::Success(value()?))
}

/// `PUT ?restype=container`
#[derive(Debug)]
pub(crate) struct CreateContainer<'a> {
    pub target: Target<'a>,
    pub metadata: &'a HashMap<String, String>,
    pub public_access: PublicAccess,
}

#[async_trait]
impl<'a> StorageRequest for CreateContainer<'a> {
    type Output = ContainerProperties;

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        self.target
            .build(Method::PUT, attempt, &[("restype", "container")])
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        if let Some(access) = self.public_access.as_header() {
            parts
                .headers
                .insert(X_MS_BLOB_PUBLIC_ACCESS, HeaderValue::from_static(access));
        }
        set_metadata(parts, self.metadata)
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        expect_status(resp, StatusCode::CREATED, || {
            Ok(ContainerAttributes::from_headers(resp.headers())?.properties)
        })
    }
}

/// `DELETE ?restype=container`
#[derive(Debug)]
pub(crate) struct DeleteContainer<'a> {
    pub target: Target<'a>,
    pub condition: Option<&'a AccessCondition>,
}

#[async_trait]
impl<'a> StorageRequest for DeleteContainer<'a> {
    type Output = ();

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        self.target
            .build(Method::DELETE, attempt, &[("restype", "container")])
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        set_condition(parts, self.condition)
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        expect_status(resp, StatusCode::ACCEPTED, || Ok(()))
    }
}

/// `HEAD ?restype=container`
///
/// With `allow_missing` a 404 is a successful `None`, which is how `exists`
/// is answered. Otherwise it is an error.
#[derive(Debug)]
pub(crate) struct GetContainerProperties<'a> {
    pub target: Target<'a>,
    pub condition: Option<&'a AccessCondition>,
    pub primary_only: bool,
    pub allow_missing: bool,
}

#[async_trait]
impl<'a> StorageRequest for GetContainerProperties<'a> {
    type Output = Option<ContainerAttributes>;

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn location_mode(&self) -> RequestLocationMode {
        if self.primary_only {
            RequestLocationMode::PrimaryOnly
        } else {
            RequestLocationMode::PrimaryOrSecondary
        }
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        self.target
            .build(Method::HEAD, attempt, &[("restype", "container")])
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        set_condition(parts, self.condition)
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        match resp.status() {
            StatusCode::OK => Ok(ResponseOutcome::Success(Some(
                ContainerAttributes::from_headers(resp.headers())?,
            ))),
            StatusCode::NOT_FOUND if self.allow_missing => Ok(ResponseOutcome::Success(None)),
            _ => Ok(ResponseOutcome::RetryableFailure),
        }
    }
}

/// `PUT ?restype=container&comp=metadata`
#[derive(Debug)]
pub(crate) struct SetContainerMetadata<'a> {
    pub target: Target<'a>,
    pub condition: Option<&'a AccessCondition>,
    pub metadata: &'a HashMap<String, String>,
}

#[async_trait]
impl<'a> StorageRequest for SetContainerMetadata<'a> {
    type Output = ContainerProperties;

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        self.target.build(
            Method::PUT,
            attempt,
            &[("restype", "container"), ("comp", "metadata")],
        )
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        set_condition(parts, self.condition)?;
        set_metadata(parts, self.metadata)
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        expect_status(resp, StatusCode::OK, || {
            Ok(ContainerAttributes::from_headers(resp.headers())?.properties)
        })
    }
}

/// `GET ?restype=container&comp=acl`
#[derive(Debug)]
pub(crate) struct GetContainerAcl<'a> {
    pub target: Target<'a>,
    pub condition: Option<&'a AccessCondition>,
}

#[async_trait]
impl<'a> StorageRequest for GetContainerAcl<'a> {
    type Output = (ContainerProperties, BlobContainerPermissions);

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn location_mode(&self) -> RequestLocationMode {
        RequestLocationMode::PrimaryOrSecondary
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        self.target.build(
            Method::GET,
            attempt,
            &[("restype", "container"), ("comp", "acl")],
        )
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        set_condition(parts, self.condition)
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        expect_status(resp, StatusCode::OK, || Ok(Default::default()))
    }

    fn post_process_response(
        &self,
        resp: http::Response<Bytes>,
        _: Self::Output,
        _: &AttemptContext<'_>,
    ) -> Result<Self::Output> {
        let properties = ContainerAttributes::from_headers(resp.headers())?.properties;
        let permissions = BlobContainerPermissions {
            public_access: properties.public_access,
            shared_access_policies: BlobContainerPermissions::parse_policies(resp.body())?,
        };
        Ok((properties, permissions))
    }
}

/// `PUT ?restype=container&comp=acl`, the stored access policies as body.
#[derive(Debug)]
pub(crate) struct SetContainerAcl<'a> {
    pub target: Target<'a>,
    pub condition: Option<&'a AccessCondition>,
    pub public_access: PublicAccess,
    pub body: Bytes,
}

#[async_trait]
impl<'a> StorageRequest for SetContainerAcl<'a> {
    type Output = ContainerProperties;

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        self.target.build_with_body(
            Method::PUT,
            attempt,
            &[("restype", "container"), ("comp", "acl")],
            self.body.clone(),
        )
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        if let Some(access) = self.public_access.as_header() {
            parts
                .headers
                .insert(X_MS_BLOB_PUBLIC_ACCESS, HeaderValue::from_static(access));
        }
        set_condition(parts, self.condition)
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        expect_status(resp, StatusCode::OK, || {
            Ok(ContainerAttributes::from_headers(resp.headers())?.properties)
        })
    }
}

/// Action of a `Lease Container` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeaseAction {
    /// Lease duration in seconds, `None` for an infinite lease.
    Acquire(Option<u32>),
    Renew,
    Release,
    /// Break period in seconds, `None` to let the lease run out.
    Break(Option<u32>),
    Change,
}

impl LeaseAction {
    fn as_str(&self) -> &'static str {
        match self {
            LeaseAction::Acquire(_) => "acquire",
            LeaseAction::Renew => "renew",
            LeaseAction::Release => "release",
            LeaseAction::Break(_) => "break",
            LeaseAction::Change => "change",
        }
    }

    fn expected_status(&self) -> StatusCode {
        match self {
            LeaseAction::Acquire(_) => StatusCode::CREATED,
            LeaseAction::Break(_) => StatusCode::ACCEPTED,
            _ => StatusCode::OK,
        }
    }
}

/// `PUT ?restype=container&comp=lease`
#[derive(Debug)]
pub(crate) struct LeaseContainer<'a> {
    pub target: Target<'a>,
    pub condition: Option<&'a AccessCondition>,
    pub action: LeaseAction,
    pub proposed_lease_id: Option<&'a str>,
}

#[async_trait]
impl<'a> StorageRequest for LeaseContainer<'a> {
    type Output = LeaseResponse;

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        self.target.build(
            Method::PUT,
            attempt,
            &[("comp", "lease"), ("restype", "container")],
        )
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        set_condition(parts, self.condition)?;
        self.set_lease_headers(parts)
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        expect_status(resp, self.action.expected_status(), || {
            Ok(LeaseResponse::default())
        })
    }

    fn post_process_response(
        &self,
        resp: http::Response<Bytes>,
        _: Self::Output,
        _: &AttemptContext<'_>,
    ) -> Result<Self::Output> {
        LeaseResponse::from_headers(resp.headers())
    }
}

impl LeaseContainer<'_> {
    fn set_lease_headers(&self, parts: &mut Parts) -> Result<()> {
        let headers = &mut parts.headers;
        headers.insert(
            X_MS_LEASE_ACTION,
            HeaderValue::from_static(self.action.as_str()),
        );
        match self.action {
            LeaseAction::Acquire(duration) => {
                let duration = duration.map_or(-1, i64::from);
                headers.insert(X_MS_LEASE_DURATION, HeaderValue::from(duration));
            }
            LeaseAction::Break(Some(period)) => {
                headers.insert(X_MS_LEASE_BREAK_PERIOD, HeaderValue::from(period));
            }
            _ => {}
        }
        if let Some(id) = self.proposed_lease_id {
            headers.insert(X_MS_PROPOSED_LEASE_ID, HeaderValue::try_from(id)?);
        }
        Ok(())
    }
}

/// `GET ?restype=container&comp=list`
#[derive(Debug)]
pub(crate) struct ListBlobs<'a> {
    pub target: Target<'a>,
    pub prefix: Option<&'a str>,
    pub delimiter: Option<&'a str>,
    pub details: BlobListingDetails,
    pub max_results: Option<u32>,
    pub token: Option<&'a ContinuationToken>,
}

#[async_trait]
impl<'a> StorageRequest for ListBlobs<'a> {
    type Output = ResultSegment<ListBlobItem>;

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn location_mode(&self) -> RequestLocationMode {
        RequestLocationMode::for_continuation(self.token)
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        let include = self.details.include();
        let max_results = self.max_results.map(|v| v.to_string());

        let mut query = vec![("restype", "container"), ("comp", "list")];
        query.extend(self.prefix.map(|v| ("prefix", v)));
        query.extend(self.delimiter.map(|v| ("delimiter", v)));
        query.extend(self.token.map(|t| ("marker", t.next_marker())));
        query.extend(max_results.as_deref().map(|v| ("maxresults", v)));
        query.extend(include.as_deref().map(|v| ("include", v)));

        self.target.build(Method::GET, attempt, &query)
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        Ok(())
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        expect_status(resp, StatusCode::OK, || {
            Ok(ResultSegment::new(Vec::new(), self.max_results, None))
        })
    }

    fn post_process_response(
        &self,
        resp: http::Response<Bytes>,
        _: Self::Output,
        attempt: &AttemptContext<'_>,
    ) -> Result<Self::Output> {
        let list = BlobList::parse(resp.body())?;
        let token = list.next_marker.map(|marker| {
            ContinuationToken::new(marker, ContinuationKind::Blob)
                .with_target_location(attempt.location())
        });
        Ok(ResultSegment::new(list.items, self.max_results, token))
    }
}

/// `GET ?comp=list` on the service endpoint.
#[derive(Debug)]
pub(crate) struct ListContainers<'a> {
    pub target: Target<'a>,
    pub prefix: Option<&'a str>,
    pub include_metadata: bool,
    pub max_results: Option<u32>,
    pub token: Option<&'a ContinuationToken>,
}

#[async_trait]
impl<'a> StorageRequest for ListContainers<'a> {
    type Output = ResultSegment<ContainerItem>;

    fn storage_uri(&self) -> &StorageUri {
        self.target.uri
    }

    fn location_mode(&self) -> RequestLocationMode {
        RequestLocationMode::for_continuation(self.token)
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        let max_results = self.max_results.map(|v| v.to_string());

        let mut query = vec![("comp", "list")];
        query.extend(self.prefix.map(|v| ("prefix", v)));
        query.extend(self.token.map(|t| ("marker", t.next_marker())));
        query.extend(max_results.as_deref().map(|v| ("maxresults", v)));
        if self.include_metadata {
            query.push(("include", "metadata"));
        }

        self.target.build(Method::GET, attempt, &query)
    }

    fn set_headers(&self, parts: &mut Parts, _: &AttemptContext<'_>) -> Result<()> {
        self.target.stamp_version(parts);
        Ok(())
    }

    async fn sign_request(&self, ctx: &Context, parts: &mut Parts, len: u64) -> Result<()> {
        self.target.sign(ctx, parts, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        expect_status(resp, StatusCode::OK, || {
            Ok(ResultSegment::new(Vec::new(), self.max_results, None))
        })
    }

    fn post_process_response(
        &self,
        resp: http::Response<Bytes>,
        _: Self::Output,
        attempt: &AttemptContext<'_>,
    ) -> Result<Self::Output> {
        let list = ContainerList::parse(resp.body())?;
        let token = list.next_marker.map(|marker| {
            ContinuationToken::new(marker, ContinuationKind::Container)
                .with_target_location(attempt.location())
        });
        Ok(ResultSegment::new(list.items, self.max_results, token))
    }
}
