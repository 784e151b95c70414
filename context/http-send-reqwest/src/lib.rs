//! Reqwest based [`HttpSend`] for azstore.
//!
//! ```no_run
//! use azstore_core::Context;
//! use azstore_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
//! ```

use async_trait::async_trait;
use azstore_core::{Error, HttpSend, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use log::debug;
use reqwest::{Client, Request};

/// [`HttpSend`] backed by a [`reqwest::Client`].
///
/// Every response the service returns is handed back as `Ok`, whatever its
/// status. Only failures to get a response become errors.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert http request").with_source(e))?;
        debug!("sending {} {}", req.method(), req.url());

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(transport_error)?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(transport_error)?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    let message = if e.is_timeout() {
        "request timed out"
    } else if e.is_connect() {
        "failed to connect"
    } else if e.is_body() || e.is_decode() {
        "failed to read response body"
    } else {
        "failed to send request"
    };
    Error::network(message).with_source(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use azstore_core::ErrorKind;

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let req = http::Request::get("http://127.0.0.1:1/c1?restype=container")
            .body(Bytes::new())
            .unwrap();

        let err = ReqwestHttpSend::default().http_send(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }
}
