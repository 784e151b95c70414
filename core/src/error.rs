use std::fmt;

use bytes::Bytes;
use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::constants::X_MS_ERROR_CODE;

/// The error type for azstore operations.
///
/// Every error surfaced by [`execute`](crate::execute) carries the HTTP status
/// and the service error code of the last attempt when the service answered,
/// so callers can branch on well-known codes such as `ContainerAlreadyExists`
/// without parsing the message.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<StatusCode>,
    error_code: Option<String>,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller broke a precondition: bad argument, wrong continuation
    /// kind, conflicting location modes.
    RequestInvalid,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Credentials exist but can't be used to sign the request.
    CredentialInvalid,

    /// The request never got a response: timeout, reset, DNS failure.
    Network,

    /// The service answered with a status the operation doesn't accept.
    Service,

    /// The exchange succeeded but the response could not be interpreted.
    ResponseInvalid,

    /// Unexpected errors
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            error_code: None,
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the HTTP status returned by the service.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the service-defined error code.
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status of the response that caused this error, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Service error code such as `ContainerNotFound`, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    /// Check if this error was raised before anything reached the wire.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RequestInvalid | ErrorKind::ConfigInvalid | ErrorKind::CredentialInvalid
        )
    }

    /// Translate a non-success response into a [`ErrorKind::Service`] error.
    ///
    /// The error code is taken from the `x-ms-error-code` header, falling back
    /// to the `<Error><Code>` element of the body. HEAD responses carry no body,
    /// so the header is the only source for them.
    pub fn from_response(resp: &http::Response<Bytes>) -> Self {
        let status = resp.status();
        let body = ServiceErrorBody::parse(resp.body());

        let code = resp
            .headers()
            .get(X_MS_ERROR_CODE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .or_else(|| body.as_ref().and_then(|b| b.code.clone()));

        let message = body
            .and_then(|b| b.message)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or(crate::messages::UNEXPECTED_STATUS_CODE_RECEIVED)
                    .to_string()
            });

        let mut err = Self::service(message).with_status(status);
        if let Some(code) = code {
            err = err.with_error_code(code);
        }
        err
    }
}

// Convenience constructors
impl Error {
    /// Create a request invalid error
    pub fn request_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestInvalid, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a credential invalid error
    pub fn credential_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CredentialInvalid, message)
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Create a service error
    pub fn service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Service, message)
    }

    /// Create a response invalid error
    pub fn response_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResponseInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RequestInvalid => write!(f, "invalid request"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::CredentialInvalid => write!(f, "invalid credentials"),
            ErrorKind::Network => write!(f, "network failure"),
            ErrorKind::Service => write!(f, "service error"),
            ErrorKind::ResponseInvalid => write!(f, "invalid response"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// `<Error><Code>..</Code><Message>..</Message></Error>` as returned by the
/// blob and queue services.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ServiceErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ServiceErrorBody {
    fn parse(body: &Bytes) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        let text = std::str::from_utf8(body).ok()?;
        quick_xml::de::from_str(text.trim_start_matches('\u{feff}')).ok()
    }
}

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderName> for Error {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::request_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::ToStrError> for Error {
    fn from(err: http::header::ToStrError) -> Self {
        Self::response_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<quick_xml::DeError> for Error {
    fn from(err: quick_xml::DeError) -> Self {
        Self::response_invalid(err.to_string()).with_source(anyhow::Error::from(err))
    }
}
