//! Primary/secondary endpoint selection.

use std::fmt;
use std::str::FromStr;

use http::Uri;
use log::warn;

use crate::messages;
use crate::retry::RetryInfo;
use crate::{ContinuationToken, Error, Result};

/// One of the two endpoints of a geo-redundant storage account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageLocation {
    /// The read-write endpoint.
    Primary,
    /// The read-only replica.
    Secondary,
}

impl StorageLocation {
    /// The other location.
    pub fn alternate(self) -> Self {
        match self {
            StorageLocation::Primary => StorageLocation::Secondary,
            StorageLocation::Secondary => StorageLocation::Primary,
        }
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLocation::Primary => write!(f, "primary"),
            StorageLocation::Secondary => write!(f, "secondary"),
        }
    }
}

/// Location mode chosen by the caller through request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationMode {
    /// Only talk to the primary.
    #[default]
    PrimaryOnly,
    /// Start at the primary, alternate on retries.
    PrimaryThenSecondary,
    /// Only talk to the secondary.
    SecondaryOnly,
    /// Start at the secondary, alternate on retries.
    SecondaryThenPrimary,
}

impl LocationMode {
    fn initial_location(self) -> StorageLocation {
        match self {
            LocationMode::PrimaryOnly | LocationMode::PrimaryThenSecondary => {
                StorageLocation::Primary
            }
            LocationMode::SecondaryOnly | LocationMode::SecondaryThenPrimary => {
                StorageLocation::Secondary
            }
        }
    }
}

/// Locations an operation is able to run against.
///
/// Writes are `PrimaryOnly`; most reads are `PrimaryOrSecondary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestLocationMode {
    /// The operation must run on the primary.
    #[default]
    PrimaryOnly,
    /// The operation must run on the secondary.
    SecondaryOnly,
    /// Either endpoint can serve the operation.
    PrimaryOrSecondary,
}

impl RequestLocationMode {
    /// Location mode for the next page of a listing.
    ///
    /// A token remembers the location that produced it, and the following
    /// pages are pinned there so one listing never mixes replicas.
    pub fn for_continuation(token: Option<&ContinuationToken>) -> Self {
        match token.and_then(|t| t.target_location()) {
            Some(StorageLocation::Primary) => RequestLocationMode::PrimaryOnly,
            Some(StorageLocation::Secondary) => RequestLocationMode::SecondaryOnly,
            None => RequestLocationMode::PrimaryOrSecondary,
        }
    }
}

/// The URIs of one resource at its primary and secondary endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageUri {
    primary: Option<Uri>,
    secondary: Option<Uri>,
}

impl StorageUri {
    /// Create a storage uri with only a primary endpoint.
    pub fn new(primary: Uri) -> Self {
        Self {
            primary: Some(primary),
            secondary: None,
        }
    }

    /// Create a storage uri from both endpoints.
    pub fn from_parts(primary: Option<Uri>, secondary: Option<Uri>) -> Self {
        Self { primary, secondary }
    }

    /// Parse primary and optional secondary from strings.
    pub fn parse(primary: &str, secondary: Option<&str>) -> Result<Self> {
        Ok(Self {
            primary: Some(Uri::from_str(primary)?),
            secondary: secondary.map(Uri::from_str).transpose()?,
        })
    }

    /// Primary endpoint, if configured.
    pub fn primary(&self) -> Option<&Uri> {
        self.primary.as_ref()
    }

    /// Secondary endpoint, if configured.
    pub fn secondary(&self) -> Option<&Uri> {
        self.secondary.as_ref()
    }

    /// Endpoint for `location`, if configured.
    pub fn get(&self, location: StorageLocation) -> Option<&Uri> {
        match location {
            StorageLocation::Primary => self.primary(),
            StorageLocation::Secondary => self.secondary(),
        }
    }

    /// Check that every location `mode` can reach is configured.
    pub fn supports(&self, mode: LocationMode) -> bool {
        match mode {
            LocationMode::PrimaryOnly => self.primary.is_some(),
            LocationMode::SecondaryOnly => self.secondary.is_some(),
            LocationMode::PrimaryThenSecondary | LocationMode::SecondaryThenPrimary => {
                self.primary.is_some() && self.secondary.is_some()
            }
        }
    }

    /// Append a path segment to both endpoints.
    ///
    /// `segment` must already be percent encoded. Query strings on the
    /// endpoints are kept.
    pub fn append_path(&self, segment: &str) -> Result<Self> {
        let join = |uri: &Uri| -> Result<Uri> {
            let mut parts = uri.clone().into_parts();
            let (path, query) = match &parts.path_and_query {
                Some(paq) => (paq.path(), paq.query()),
                None => ("/", None),
            };

            let mut paq = path.trim_end_matches('/').to_string();
            paq.push('/');
            paq.push_str(segment.trim_start_matches('/'));
            if let Some(query) = query {
                paq.push('?');
                paq.push_str(query);
            }

            parts.path_and_query = Some(paq.parse()?);
            Ok(Uri::from_parts(parts)?)
        };

        Ok(Self {
            primary: self.primary.as_ref().map(join).transpose()?,
            secondary: self.secondary.as_ref().map(join).transpose()?,
        })
    }
}

/// Tracks which endpoint each attempt of one call targets.
///
/// The selector combines the operation's [`RequestLocationMode`] with the
/// caller's [`LocationMode`] once, then follows the retry policy's decisions
/// without ever leaving what the operation allows.
#[derive(Debug, Clone)]
pub struct LocationSelector {
    request_mode: RequestLocationMode,
    location_mode: LocationMode,
    current: StorageLocation,
}

impl LocationSelector {
    /// Resolve the first location of a call.
    ///
    /// Fails with a usage error when the modes conflict or when `uri` lacks an
    /// endpoint the effective mode needs.
    pub fn new(
        request_mode: RequestLocationMode,
        location_mode: LocationMode,
        uri: &StorageUri,
    ) -> Result<Self> {
        let location_mode = match request_mode {
            RequestLocationMode::PrimaryOnly => {
                if location_mode == LocationMode::SecondaryOnly {
                    return Err(Error::request_invalid(messages::PRIMARY_ONLY_COMMAND));
                }
                LocationMode::PrimaryOnly
            }
            RequestLocationMode::SecondaryOnly => {
                if location_mode == LocationMode::PrimaryOnly {
                    return Err(Error::request_invalid(messages::SECONDARY_ONLY_COMMAND));
                }
                LocationMode::SecondaryOnly
            }
            RequestLocationMode::PrimaryOrSecondary => location_mode,
        };

        if !uri.supports(location_mode) {
            return Err(Error::request_invalid(
                messages::STORAGE_URI_MISSING_LOCATION,
            ));
        }

        Ok(Self {
            request_mode,
            location_mode,
            current: location_mode.initial_location(),
        })
    }

    /// Location of the attempt in progress.
    pub fn current(&self) -> StorageLocation {
        self.current
    }

    /// Effective location mode of the call.
    pub fn location_mode(&self) -> LocationMode {
        self.location_mode
    }

    /// Location the next attempt would target if the policy keeps the mode.
    pub fn next_location(&self) -> StorageLocation {
        match self.location_mode {
            LocationMode::PrimaryOnly => StorageLocation::Primary,
            LocationMode::SecondaryOnly => StorageLocation::Secondary,
            LocationMode::PrimaryThenSecondary | LocationMode::SecondaryThenPrimary => {
                self.current.alternate()
            }
        }
    }

    /// Move to the location chosen by a retry decision.
    ///
    /// Decisions that would leave the operation's declared mode are clamped.
    pub fn apply(&mut self, info: &RetryInfo) {
        let (target, mode) = match self.request_mode {
            RequestLocationMode::PrimaryOnly => {
                (StorageLocation::Primary, LocationMode::PrimaryOnly)
            }
            RequestLocationMode::SecondaryOnly => {
                (StorageLocation::Secondary, LocationMode::SecondaryOnly)
            }
            RequestLocationMode::PrimaryOrSecondary => {
                (info.target_location(), info.updated_location_mode())
            }
        };

        if target != info.target_location() {
            warn!(
                "retry policy asked for {} but operation is {:?}, staying on {}",
                info.target_location(),
                self.request_mode,
                target
            );
        }

        self.current = target;
        self.location_mode = mode;
    }
}
