use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use azstore_core::{
    execute, lazy_segmented, messages, ContinuationKind, ContinuationToken, Error,
    OperationContext, RequestOptions, Result, ResultSegment, SegmentedRequest, StorageUri,
};
use futures::Stream;
use http::StatusCode;
use log::debug;
use percent_encoding::utf8_percent_encode;

use crate::client::ClientInner;
use crate::constants::*;
use crate::request::*;
use crate::response::{ContainerProperties, LeaseResponse, ListBlobItem, PublicAccess};
use crate::{AccessCondition, BlobContainerPermissions};

/// A blob container.
///
/// The container keeps the properties and metadata of the last response
/// that carried them. Operations that change them take `&mut self`.
#[derive(Debug, Clone)]
pub struct BlobContainer {
    inner: Arc<ClientInner>,
    name: String,
    storage_uri: StorageUri,
    metadata: HashMap<String, String>,
    properties: ContainerProperties,
}

impl BlobContainer {
    pub(crate) fn new(inner: Arc<ClientInner>, name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::request_invalid(messages::format(
                messages::ARGUMENT_NULL_OR_EMPTY,
                &[&"name"],
            )));
        }

        let segment = utf8_percent_encode(name, &PATH_ENCODE_SET).to_string();
        let storage_uri = inner.storage_uri.append_path(&segment)?;

        Ok(Self {
            inner,
            name: name.to_string(),
            storage_uri,
            metadata: HashMap::new(),
            properties: ContainerProperties::default(),
        })
    }

    /// Container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Container endpoints.
    pub fn storage_uri(&self) -> &StorageUri {
        &self.storage_uri
    }

    /// Metadata sent by `create` and `upload_metadata`, or read by
    /// `download_attributes`.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// Replace the metadata. Nothing is sent until `upload_metadata` or `create`.
    pub fn set_metadata(&mut self, metadata: HashMap<String, String>) {
        self.metadata = metadata;
    }

    /// Last known properties.
    pub fn properties(&self) -> &ContainerProperties {
        &self.properties
    }

    fn target(&self) -> Target<'_> {
        Target {
            uri: &self.storage_uri,
            signer: &self.inner.signer,
        }
    }

    fn options(&self, options: Option<&RequestOptions>) -> RequestOptions {
        options
            .unwrap_or(&RequestOptions::new())
            .apply_defaults(&self.inner.default_options)
    }

    fn update_etag_and_last_modified(&mut self, properties: ContainerProperties) {
        self.properties.etag = properties.etag;
        self.properties.last_modified = properties.last_modified;
    }

    /// Create the container.
    ///
    /// Fails with a service error carrying `ContainerAlreadyExists` if it
    /// exists already.
    pub async fn create(
        &mut self,
        public_access: PublicAccess,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<()> {
        let options = self.options(options);
        let request = CreateContainer {
            target: self.target(),
            metadata: &self.metadata,
            public_access,
        };

        let mut properties = execute(&self.inner.ctx, &request, &options, op_ctx).await?;
        properties.public_access = public_access;
        self.properties = properties;
        Ok(())
    }

    /// Create the container unless it exists.
    ///
    /// Returns `true` if this call created it.
    pub async fn create_if_not_exists(
        &mut self,
        public_access: PublicAccess,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<bool> {
        if self.exists_at(true, None, options, op_ctx).await? {
            return Ok(false);
        }

        match self.create(public_access, options, op_ctx).await {
            Ok(()) => Ok(true),
            Err(err)
                if err.status() == Some(StatusCode::CONFLICT)
                    && err.error_code() == Some(CONTAINER_ALREADY_EXISTS) =>
            {
                debug!("container {} created concurrently", self.name);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Delete the container.
    ///
    /// A leased container can only be deleted with its lease id.
    pub async fn delete(
        &self,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<()> {
        let options = self.options(options);
        let request = DeleteContainer {
            target: self.target(),
            condition: access_condition,
        };

        execute(&self.inner.ctx, &request, &options, op_ctx).await
    }

    /// Delete the container if it exists.
    ///
    /// Returns `true` if this call deleted it.
    pub async fn delete_if_exists(
        &mut self,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<bool> {
        if !self
            .exists_at(true, access_condition, options, op_ctx)
            .await?
        {
            return Ok(false);
        }

        match self.delete(access_condition, options, op_ctx).await {
            Ok(()) => Ok(true),
            Err(err)
                if err.status() == Some(StatusCode::NOT_FOUND)
                    && matches!(
                        err.error_code(),
                        Some(CONTAINER_NOT_FOUND) | Some(RESOURCE_NOT_FOUND)
                    ) =>
            {
                debug!("container {} deleted concurrently", self.name);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /// Check whether the container exists.
    ///
    /// May be answered by the secondary. Properties are refreshed when it
    /// exists.
    pub async fn exists(
        &mut self,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<bool> {
        self.exists_at(false, access_condition, options, op_ctx).await
    }

    async fn exists_at(
        &mut self,
        primary_only: bool,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<bool> {
        let options = self.options(options);
        let request = GetContainerProperties {
            target: self.target(),
            condition: access_condition,
            primary_only,
            allow_missing: true,
        };

        match execute(&self.inner.ctx, &request, &options, op_ctx).await? {
            Some(attrs) => {
                self.properties = attrs.properties;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Read properties and metadata of the container.
    pub async fn download_attributes(
        &mut self,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<()> {
        let options = self.options(options);
        let request = GetContainerProperties {
            target: self.target(),
            condition: access_condition,
            primary_only: false,
            allow_missing: false,
        };

        let attrs = execute(&self.inner.ctx, &request, &options, op_ctx)
            .await?
            .ok_or_else(|| Error::unexpected("container properties missing from response"))?;
        self.properties = attrs.properties;
        self.metadata = attrs.metadata;
        Ok(())
    }

    /// Replace the metadata of the container with [`BlobContainer::metadata`].
    pub async fn upload_metadata(
        &mut self,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<()> {
        let options = self.options(options);
        let request = SetContainerMetadata {
            target: self.target(),
            condition: access_condition,
            metadata: &self.metadata,
        };

        let properties = execute(&self.inner.ctx, &request, &options, op_ctx).await?;
        self.update_etag_and_last_modified(properties);
        Ok(())
    }

    /// Read the public access level and stored access policies.
    ///
    /// May be answered by the secondary.
    pub async fn download_permissions(
        &mut self,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<BlobContainerPermissions> {
        let options = self.options(options);
        let request = GetContainerAcl {
            target: self.target(),
            condition: access_condition,
        };

        let (properties, permissions) =
            execute(&self.inner.ctx, &request, &options, op_ctx).await?;
        self.properties.public_access = properties.public_access;
        self.update_etag_and_last_modified(properties);
        Ok(permissions)
    }

    /// Replace the public access level and stored access policies.
    pub async fn upload_permissions(
        &mut self,
        permissions: &BlobContainerPermissions,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<()> {
        let options = self.options(options);
        let request = SetContainerAcl {
            target: self.target(),
            condition: access_condition,
            public_access: permissions.public_access,
            body: permissions.to_xml()?,
        };

        let properties = execute(&self.inner.ctx, &request, &options, op_ctx).await?;
        self.properties.public_access = permissions.public_access;
        self.update_etag_and_last_modified(properties);
        Ok(())
    }

    async fn lease(
        &mut self,
        action: LeaseAction,
        proposed_lease_id: Option<&str>,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<LeaseResponse> {
        let options = self.options(options);
        let request = LeaseContainer {
            target: self.target(),
            condition: access_condition,
            action,
            proposed_lease_id,
        };

        let resp = execute(&self.inner.ctx, &request, &options, op_ctx).await?;
        debug!("container {} lease {:?} done", self.name, action);
        self.update_etag_and_last_modified(resp.properties.clone());
        Ok(resp)
    }

    /// Acquire a lease and return its id.
    ///
    /// `lease_duration` is in seconds, between 15 and 60. `None` acquires
    /// an infinite lease.
    pub async fn acquire_lease(
        &mut self,
        lease_duration: Option<u32>,
        proposed_lease_id: Option<&str>,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<String> {
        if let Some(d) = lease_duration {
            check_in_range("lease_duration", d, MIN_LEASE_DURATION..=MAX_LEASE_DURATION)?;
        }

        let action = LeaseAction::Acquire(lease_duration);
        self.lease(action, proposed_lease_id, access_condition, options, op_ctx)
            .await?
            .lease_id
            .ok_or_else(|| Error::response_invalid("lease id missing from response"))
    }

    /// Renew the lease named by `access_condition`.
    pub async fn renew_lease(
        &mut self,
        access_condition: &AccessCondition,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<()> {
        access_condition.required_lease_id()?;

        self.lease(LeaseAction::Renew, None, Some(access_condition), options, op_ctx)
            .await?;
        Ok(())
    }

    /// Release the lease named by `access_condition`.
    pub async fn release_lease(
        &mut self,
        access_condition: &AccessCondition,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<()> {
        access_condition.required_lease_id()?;

        self.lease(LeaseAction::Release, None, Some(access_condition), options, op_ctx)
            .await?;
        Ok(())
    }

    /// Break the current lease.
    ///
    /// `break_period` is in seconds, at most 60. `None` lets a fixed lease
    /// run out and breaks an infinite one at once. Returns the time left
    /// until the lease is broken, if the service reported it.
    pub async fn break_lease(
        &mut self,
        break_period: Option<u32>,
        access_condition: Option<&AccessCondition>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<Option<Duration>> {
        if let Some(p) = break_period {
            check_in_range("break_period", p, 0..=MAX_LEASE_BREAK_PERIOD)?;
        }

        let action = LeaseAction::Break(break_period);
        let resp = self
            .lease(action, None, access_condition, options, op_ctx)
            .await?;
        Ok(resp.lease_time)
    }

    /// Change the id of the lease named by `access_condition`.
    ///
    /// Returns the new lease id.
    pub async fn change_lease(
        &mut self,
        proposed_lease_id: &str,
        access_condition: &AccessCondition,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<String> {
        if proposed_lease_id.is_empty() {
            return Err(Error::request_invalid(messages::format(
                messages::ARGUMENT_NULL_OR_EMPTY,
                &[&"proposed_lease_id"],
            )));
        }
        access_condition.required_lease_id()?;

        let resp = self
            .lease(
                LeaseAction::Change,
                Some(proposed_lease_id),
                Some(access_condition),
                options,
                op_ctx,
            )
            .await?;
        Ok(resp
            .lease_id
            .unwrap_or_else(|| proposed_lease_id.to_string()))
    }

    /// List one page of blobs.
    ///
    /// Without `flat` the listing is hierarchical: blobs below the next
    /// directory delimiter are folded into [`ListBlobItem::Prefix`] entries.
    /// Snapshots can only be listed flat.
    ///
    /// A `token` must come from a previous blob listing. The page is read from
    /// the location that produced the token.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_blobs_segmented(
        &self,
        prefix: Option<&str>,
        flat: bool,
        details: BlobListingDetails,
        max_results: Option<u32>,
        token: Option<&ContinuationToken>,
        options: Option<&RequestOptions>,
        op_ctx: &mut OperationContext,
    ) -> Result<ResultSegment<ListBlobItem>> {
        ContinuationToken::assert_kind(token, ContinuationKind::Blob)?;
        if !flat && details.snapshots {
            return Err(Error::request_invalid(messages::SNAPSHOT_LISTING_ERROR));
        }

        let options = self.options(options);
        let request = ListBlobs {
            target: self.target(),
            prefix,
            delimiter: (!flat).then_some(self.inner.delimiter.as_str()),
            details,
            max_results,
            token,
        };

        execute(&self.inner.ctx, &request, &options, op_ctx).await
    }

    /// List all blobs lazily.
    ///
    /// Pages are fetched as the stream is polled, each with a fresh
    /// [`OperationContext`]. Argument errors are reported before any request.
    pub fn list_blobs<'a>(
        &'a self,
        prefix: Option<&'a str>,
        flat: bool,
        details: BlobListingDetails,
        options: Option<&'a RequestOptions>,
    ) -> Result<impl Stream<Item = Result<ListBlobItem>> + 'a> {
        if !flat && details.snapshots {
            return Err(Error::request_invalid(messages::SNAPSHOT_LISTING_ERROR));
        }

        Ok(lazy_segmented(
            SegmentedRequest::default(),
            move |req: SegmentedRequest| async move {
                let mut op_ctx = OperationContext::new();
                self.list_blobs_segmented(
                    prefix,
                    flat,
                    details,
                    None,
                    req.token(),
                    options,
                    &mut op_ctx,
                )
                .await
            },
        ))
    }
}

fn check_in_range(name: &str, value: u32, range: std::ops::RangeInclusive<u32>) -> Result<()> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(Error::request_invalid(messages::format(
        messages::ARGUMENT_OUT_OF_RANGE_ERROR,
        &[&name, &value],
    )))
}
