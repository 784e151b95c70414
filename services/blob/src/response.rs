//! Blob service responses: listing bodies and container headers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use azstore_core::time::{parse_http_date, DateTime};
use azstore_core::{messages, Error, Result};
use bytes::Bytes;
use http::header::{ETAG, LAST_MODIFIED};
use http::HeaderMap;
use serde::{Deserialize, Deserializer};

use crate::constants::*;

/// Level of anonymous read access on a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublicAccess {
    /// Only authorized requests.
    #[default]
    Off,
    /// Anonymous read of the container and its blobs, listing included.
    Container,
    /// Anonymous read of blobs only.
    Blob,
}

impl PublicAccess {
    /// Value of the `x-ms-blob-public-access` header, `None` for [`PublicAccess::Off`].
    pub fn as_header(&self) -> Option<&'static str> {
        match self {
            PublicAccess::Off => None,
            PublicAccess::Container => Some("container"),
            PublicAccess::Blob => Some("blob"),
        }
    }
}

impl FromStr for PublicAccess {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" => Ok(PublicAccess::Off),
            "container" => Ok(PublicAccess::Container),
            "blob" => Ok(PublicAccess::Blob),
            _ => Err(Error::response_invalid(messages::format(
                messages::INVALID_ACL_ACCESS_TYPE,
                &[&s],
            ))),
        }
    }
}

impl fmt::Display for PublicAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_header().unwrap_or("off"))
    }
}

/// System properties of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerProperties {
    /// Entity tag, quoted as sent by the service.
    pub etag: Option<String>,
    /// Last time the container or its metadata changed.
    pub last_modified: Option<DateTime>,
    /// `locked` or `unlocked`.
    pub lease_status: Option<String>,
    /// `available`, `leased`, `expired`, `breaking` or `broken`.
    pub lease_state: Option<String>,
    /// `infinite` or `fixed`, set while the container is leased.
    pub lease_duration: Option<String>,
    /// Anonymous access level.
    pub public_access: PublicAccess,
}

/// Properties and metadata carried by container response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ContainerAttributes {
    pub properties: ContainerProperties,
    pub metadata: HashMap<String, String>,
}

impl ContainerAttributes {
    /// Parse a `Get Container Properties` or `Create Container` response.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let header = |name: &str| -> Result<Option<String>> {
            match headers.get(name) {
                Some(v) => Ok(Some(v.to_str()?.to_string())),
                None => Ok(None),
            }
        };

        let last_modified = header(LAST_MODIFIED.as_str())?
            .map(|v| parse_http_date(&v))
            .transpose()?;
        let public_access = header(X_MS_BLOB_PUBLIC_ACCESS)?
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        let mut metadata = HashMap::new();
        for (k, v) in headers {
            if let Some(name) = k.as_str().strip_prefix(X_MS_META_PREFIX) {
                metadata.insert(name.to_string(), v.to_str()?.to_string());
            }
        }

        Ok(Self {
            properties: ContainerProperties {
                etag: header(ETAG.as_str())?,
                last_modified,
                lease_status: header(X_MS_LEASE_STATUS)?,
                lease_state: header(X_MS_LEASE_STATE)?,
                lease_duration: header(X_MS_LEASE_DURATION)?,
                public_access,
            },
            metadata,
        })
    }
}

/// What a `Lease Container` response carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LeaseResponse {
    pub properties: ContainerProperties,
    pub lease_id: Option<String>,
    pub lease_time: Option<Duration>,
}

impl LeaseResponse {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let lease_id = match headers.get(X_MS_LEASE_ID) {
            Some(v) => Some(v.to_str()?.to_string()),
            None => None,
        };
        let lease_time = match headers.get(X_MS_LEASE_TIME) {
            Some(v) => {
                let secs = v.to_str()?.parse::<u64>().map_err(|err| {
                    Error::response_invalid(messages::INVALID_RESPONSE_RECEIVED).with_source(err)
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            properties: ContainerAttributes::from_headers(headers)?.properties,
            lease_id,
            lease_time,
        })
    }
}

/// A blob returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Full blob name, relative to its container.
    pub name: String,
    /// Snapshot timestamp, set on snapshot entries only.
    pub snapshot: Option<String>,
    /// Size in bytes.
    pub content_length: u64,
    /// Content type.
    pub content_type: Option<String>,
    /// Entity tag.
    pub etag: String,
    /// Last modified time.
    pub last_modified: DateTime,
    /// `BlockBlob`, `PageBlob` or `AppendBlob`.
    pub blob_type: Option<String>,
    /// User metadata, filled when the listing asked for it.
    pub metadata: HashMap<String, String>,
}

/// One entry of a blob listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListBlobItem {
    /// A blob.
    Blob(BlobItem),
    /// A virtual directory of a hierarchical listing.
    ///
    /// The name ends with the delimiter.
    Prefix(String),
}

impl ListBlobItem {
    /// Name of the blob or virtual directory.
    pub fn name(&self) -> &str {
        match self {
            ListBlobItem::Blob(b) => &b.name,
            ListBlobItem::Prefix(p) => p,
        }
    }
}

/// A container returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerItem {
    /// Container name.
    pub name: String,
    /// System properties.
    pub properties: ContainerProperties,
    /// User metadata, filled when the listing asked for it.
    pub metadata: HashMap<String, String>,
}

/// A page of blobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BlobList {
    pub items: Vec<ListBlobItem>,
    pub next_marker: Option<String>,
}

/// A page of containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContainerList {
    pub items: Vec<ContainerItem>,
    pub next_marker: Option<String>,
}

impl BlobList {
    /// Parse a `List Blobs` body.
    ///
    /// Blobs and prefixes are returned merged in name order, the order the
    /// service enumerates them in.
    pub fn parse(body: &Bytes) -> Result<Self> {
        let resp: ListBlobsResponse = parse_xml(body)?;

        let mut items: Vec<ListBlobItem> = resp
            .blobs
            .blob_prefix
            .into_iter()
            .map(|p| ListBlobItem::Prefix(p.name))
            .chain(resp.blobs.blobs.into_iter().map(|b| {
                ListBlobItem::Blob(BlobItem {
                    name: b.name,
                    snapshot: b.snapshot.filter(|v| !v.is_empty()),
                    content_length: b.properties.content_length,
                    content_type: b.properties.content_type.filter(|v| !v.is_empty()),
                    etag: b.properties.etag,
                    last_modified: b.properties.last_modified,
                    blob_type: b.properties.blob_type,
                    metadata: b.metadata.unwrap_or_default(),
                })
            }))
            .collect();
        // Snapshots share their base blob's name and must keep their order.
        items.sort_by(|a, b| a.name().cmp(b.name()));

        Ok(Self {
            items,
            next_marker: resp.next_marker.filter(|v| !v.is_empty()),
        })
    }
}

impl ContainerList {
    /// Parse a `List Containers` body.
    pub fn parse(body: &Bytes) -> Result<Self> {
        let resp: ListContainersResponse = parse_xml(body)?;

        let items = resp
            .containers
            .containers
            .into_iter()
            .map(|c| {
                Ok(ContainerItem {
                    name: c.name,
                    properties: ContainerProperties {
                        etag: Some(c.properties.etag),
                        last_modified: Some(c.properties.last_modified),
                        lease_status: c.properties.lease_status,
                        lease_state: c.properties.lease_state,
                        lease_duration: c.properties.lease_duration,
                        public_access: c
                            .properties
                            .public_access
                            .as_deref()
                            .unwrap_or_default()
                            .parse()?,
                    },
                    metadata: c.metadata.unwrap_or_default(),
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            items,
            next_marker: resp.next_marker.filter(|v| !v.is_empty()),
        })
    }
}

pub(crate) fn parse_xml<'de, T: Deserialize<'de>>(body: &'de Bytes) -> Result<T> {
    let text = std::str::from_utf8(body).map_err(|err| {
        Error::response_invalid(messages::INVALID_RESPONSE_RECEIVED).with_source(err)
    })?;
    Ok(quick_xml::de::from_str(text.trim_start_matches('\u{feff}'))?)
}

fn deserialize_http_date<'de, D>(deserializer: D) -> std::result::Result<DateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_http_date(&s).map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBlobsResponse {
    #[serde(default)]
    blobs: Blobs,
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Blobs {
    #[serde(default)]
    blob_prefix: Vec<Prefix>,
    #[serde(rename = "Blob", default)]
    blobs: Vec<Blob>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Prefix {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Blob {
    name: String,
    snapshot: Option<String>,
    properties: BlobProperties,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobProperties {
    #[serde(deserialize_with = "deserialize_http_date", rename = "Last-Modified")]
    last_modified: DateTime,
    etag: String,
    #[serde(rename = "Content-Length")]
    content_length: u64,
    #[serde(rename = "Content-Type")]
    content_type: Option<String>,
    blob_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListContainersResponse {
    #[serde(default)]
    containers: Containers,
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Containers {
    #[serde(rename = "Container", default)]
    containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Container {
    name: String,
    properties: ContainerXmlProperties,
    metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerXmlProperties {
    #[serde(deserialize_with = "deserialize_http_date", rename = "Last-Modified")]
    last_modified: DateTime,
    etag: String,
    lease_status: Option<String>,
    lease_state: Option<String>,
    lease_duration: Option<String>,
    public_access: Option<String>,
}
