use azstore_core::time::{format_http_date, DateTime};
use azstore_core::{messages, Error, Result};
use http::header::{IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE};
use http::request::Parts;
use http::HeaderValue;

use crate::constants::X_MS_LEASE_ID;

/// Conditions a container request is sent under.
///
/// The service answers `412 Precondition Failed` when one of them does not
/// hold. Which conditions an operation honors is up to the service: lease
/// ids are required to change a leased container, while etag conditions are
/// only evaluated by some container operations.
///
/// ```
/// use azstore_blob::AccessCondition;
///
/// let condition = AccessCondition::new()
///     .with_lease_id("9e5ba8ee-3f19-4c2b-a7d5-2c1c6b6a5f2c")
///     .with_if_match("\"0x8D93C7D4629C7D9\"");
/// assert!(condition.lease_id().is_some());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessCondition {
    if_match: Option<String>,
    if_none_match: Option<String>,
    if_modified_since: Option<DateTime>,
    if_unmodified_since: Option<DateTime>,
    lease_id: Option<String>,
}

impl AccessCondition {
    /// Create an empty condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only proceed if the resource's etag matches.
    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    /// Only proceed if the resource's etag does not match. `*` matches any.
    pub fn with_if_none_match(mut self, etag: impl Into<String>) -> Self {
        self.if_none_match = Some(etag.into());
        self
    }

    /// Only proceed if the resource changed after `t`.
    pub fn with_if_modified_since(mut self, t: DateTime) -> Self {
        self.if_modified_since = Some(t);
        self
    }

    /// Only proceed if the resource did not change after `t`.
    pub fn with_if_unmodified_since(mut self, t: DateTime) -> Self {
        self.if_unmodified_since = Some(t);
        self
    }

    /// Only proceed if the resource holds this active lease.
    pub fn with_lease_id(mut self, lease_id: impl Into<String>) -> Self {
        self.lease_id = Some(lease_id.into());
        self
    }

    /// Lease id, if any.
    pub fn lease_id(&self) -> Option<&str> {
        self.lease_id.as_deref()
    }

    /// Lease id, failing when it is missing or empty.
    pub(crate) fn required_lease_id(&self) -> Result<&str> {
        match self.lease_id() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(Error::request_invalid(messages::format(
                messages::ARGUMENT_NULL_OR_EMPTY,
                &[&"lease_id"],
            ))),
        }
    }

    pub(crate) fn apply(&self, parts: &mut Parts) -> Result<()> {
        let headers = &mut parts.headers;

        if let Some(v) = &self.if_match {
            headers.insert(IF_MATCH, v.parse()?);
        }
        if let Some(v) = &self.if_none_match {
            headers.insert(IF_NONE_MATCH, v.parse()?);
        }
        if let Some(t) = self.if_modified_since {
            headers.insert(IF_MODIFIED_SINCE, format_http_date(t).parse()?);
        }
        if let Some(t) = self.if_unmodified_since {
            headers.insert(IF_UNMODIFIED_SINCE, format_http_date(t).parse()?);
        }
        if let Some(v) = &self.lease_id {
            headers.insert(X_MS_LEASE_ID, HeaderValue::try_from(v.as_str())?);
        }
        Ok(())
    }
}
