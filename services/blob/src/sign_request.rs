use std::fmt::Write;

use async_trait::async_trait;
use azstore_core::hash::{base64_decode, base64_hmac_sha256};
use azstore_core::time::{format_http_date, now, DateTime};
use azstore_core::{Context, Error, Result, SignRequest, SigningRequest};
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;

use crate::constants::*;
use crate::Credential;

/// RequestSigner that authorizes blob requests.
///
/// - [Authorize with Shared Key](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key)
/// - SAS tokens are appended to the query.
/// - Bearer tokens go to the `Authorization` header.
///
/// Without credential requests are sent anonymously.
#[derive(Debug, Clone, Default)]
pub struct RequestSigner {
    credential: Option<Credential>,
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a signer for `credential`.
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            credential,
            time: None,
        }
    }

    /// Credential used by this signer.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    #[cfg(test)]
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

#[async_trait]
impl SignRequest for RequestSigner {
    async fn sign_request(&self, _: &Context, req: &mut Parts, content_length: u64) -> Result<()> {
        let Some(cred) = &self.credential else {
            return Ok(());
        };
        if !cred.is_valid() {
            return Err(Error::credential_invalid(
                "credential is empty or expired, can't sign request",
            ));
        }

        let mut ctx = SigningRequest::build(req)?;
        let now_time = self.time.unwrap_or_else(now);

        match cred {
            Credential::SasToken { token } => {
                ctx.query_append(token);
            }
            Credential::BearerToken { token, .. } => {
                ctx.headers
                    .insert(X_MS_DATE, format_http_date(now_time).parse()?);
                let mut value: HeaderValue = format!("Bearer {token}").parse()?;
                value.set_sensitive(true);
                ctx.headers.insert(header::AUTHORIZATION, value);
            }
            Credential::SharedKey {
                account_name,
                account_key,
            } => {
                ctx.headers
                    .insert(X_MS_DATE, format_http_date(now_time).parse()?);
                let string_to_sign = string_to_sign(&ctx, account_name, content_length)?;
                let key = base64_decode(account_key)?;
                let signature = base64_hmac_sha256(&key, string_to_sign.as_bytes());

                let mut value: HeaderValue =
                    format!("SharedKey {account_name}:{signature}").parse()?;
                value.set_sensitive(true);
                ctx.headers.insert(header::AUTHORIZATION, value);
            }
        }

        ctx.apply(req)
    }
}

/// Construct string to sign
///
/// ## Format
///
/// ```text
/// VERB + "\n" +
/// Content-Encoding + "\n" +
/// Content-Language + "\n" +
/// Content-Length + "\n" +
/// Content-MD5 + "\n" +
/// Content-Type + "\n" +
/// Date + "\n" +
/// If-Modified-Since + "\n" +
/// If-Match + "\n" +
/// If-None-Match + "\n" +
/// If-Unmodified-Since + "\n" +
/// Range + "\n" +
/// CanonicalizedHeaders +
/// CanonicalizedResource;
/// ```
///
/// Content-Length is left empty for bodies of zero length.
fn string_to_sign(ctx: &SigningRequest, account_name: &str, content_length: u64) -> Result<String> {
    let mut s = String::with_capacity(256);

    writeln!(&mut s, "{}", ctx.method.as_str())?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_ENCODING)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_LANGUAGE)?)?;
    if content_length == 0 {
        writeln!(&mut s)?;
    } else {
        writeln!(&mut s, "{content_length}")?;
    }
    writeln!(
        &mut s,
        "{}",
        ctx.header_get_or_default(&header::HeaderName::from_static("content-md5"))?
    )?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::CONTENT_TYPE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::DATE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MODIFIED_SINCE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_MATCH)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_NONE_MATCH)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::IF_UNMODIFIED_SINCE)?)?;
    writeln!(&mut s, "{}", ctx.header_get_or_default(&header::RANGE)?)?;
    writeln!(
        &mut s,
        "{}",
        SigningRequest::pairs_to_string(ctx.header_to_vec_with_prefix("x-ms-")?, ":", "\n")
    )?;
    write!(&mut s, "{}", canonicalize_resource(ctx, account_name))?;

    debug!("string to sign: {}", &s);

    Ok(s)
}

/// ## Reference
///
/// - [Constructing the canonicalized resource string](https://docs.microsoft.com/en-us/rest/api/storageservices/authorize-with-shared-key#constructing-the-canonicalized-resource-string)
fn canonicalize_resource(ctx: &SigningRequest, account_name: &str) -> String {
    if ctx.query.is_empty() {
        return format!("/{}{}", account_name, ctx.path);
    }

    let mut grouped: Vec<(String, Vec<&str>)> = Vec::with_capacity(ctx.query.len());
    for (k, v) in &ctx.query {
        let k = k.to_lowercase();
        match grouped.iter_mut().find(|(name, _)| *name == k) {
            Some((_, values)) => values.push(v.as_str()),
            None => grouped.push((k, vec![v.as_str()])),
        }
    }
    let query = grouped
        .into_iter()
        .map(|(k, mut values)| {
            values.sort_unstable();
            (k, values.join(","))
        })
        .collect();

    format!(
        "/{}{}\n{}",
        account_name,
        ctx.path,
        SigningRequest::pairs_to_string(query, ":", "\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn test_time() -> DateTime {
        Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap()
    }

    fn parts(method: http::Method, uri: &str) -> Parts {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .header(X_MS_VERSION, STORAGE_VERSION)
            .header("x-ms-meta-Owner", "ops")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_string_to_sign() {
        let mut p = parts(
            http::Method::GET,
            "https://acct.blob.core.windows.net/c1?restype=container&comp=list&include=metadata&include=snapshots",
        );
        let mut ctx = SigningRequest::build(&mut p).unwrap();
        ctx.headers
            .insert(X_MS_DATE, format_http_date(test_time()).parse().unwrap());

        let s = string_to_sign(&ctx, "acct", 0).unwrap();
        assert_eq!(
            s,
            "GET\n\n\n\n\n\n\n\n\n\n\n\n\
             x-ms-date:Tue, 01 Mar 2022 08:12:34 GMT\n\
             x-ms-meta-owner:ops\n\
             x-ms-version:2021-08-06\n\
             /acct/c1\n\
             comp:list\n\
             include:metadata,snapshots\n\
             restype:container"
        );
    }

    #[test]
    fn test_repeated_query_values_are_sorted() {
        let mut p = parts(
            http::Method::GET,
            "https://acct.blob.core.windows.net/c1?Include=snapshots&comp=list&include=copy&include=metadata",
        );
        let ctx = SigningRequest::build(&mut p).unwrap();

        assert_eq!(
            canonicalize_resource(&ctx, "acct"),
            "/acct/c1\ncomp:list\ninclude:copy,metadata,snapshots"
        );
    }

    #[test]
    fn test_content_length_line() {
        let mut p = parts(http::Method::PUT, "https://acct.blob.core.windows.net/c1");
        let ctx = SigningRequest::build(&mut p).unwrap();

        let s = string_to_sign(&ctx, "acct", 12).unwrap();
        assert!(s.starts_with("PUT\n\n\n12\n"), "{s}");
    }

    #[tokio::test]
    async fn test_shared_key_header() {
        let signer = RequestSigner::new(Some(Credential::with_shared_key("acct", "c2VjcmV0")))
            .with_time(test_time());
        let mut p = parts(http::Method::HEAD, "https://acct.blob.core.windows.net/c1?restype=container");

        signer
            .sign_request(&Context::new(), &mut p, 0)
            .await
            .unwrap();

        let auth = p.headers[header::AUTHORIZATION].to_str().unwrap();
        assert!(auth.starts_with("SharedKey acct:"), "{auth}");
        assert!(p.headers[header::AUTHORIZATION].is_sensitive());
        assert_eq!(p.headers[X_MS_DATE], "Tue, 01 Mar 2022 08:12:34 GMT");
        assert_eq!(
            p.uri.to_string(),
            "https://acct.blob.core.windows.net/c1?restype=container"
        );
    }

    #[tokio::test]
    async fn test_sas_token() {
        let signer = RequestSigner::new(Some(Credential::with_sas_token(
            "sv=2021-08-06&ss=b&sig=KEllk4N8f7rJfLjQ%2B%2Bl73%3D",
        )));
        let mut p = parts(http::Method::GET, "https://acct.blob.core.windows.net/c1?restype=container");

        signer
            .sign_request(&Context::new(), &mut p, 0)
            .await
            .unwrap();

        assert_eq!(
            p.uri.to_string(),
            "https://acct.blob.core.windows.net/c1?restype=container&sv=2021-08-06&ss=b&sig=KEllk4N8f7rJfLjQ%2B%2Bl73%3D"
        );
        assert!(!p.headers.contains_key(header::AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let signer = RequestSigner::new(Some(Credential::with_bearer_token("token", None)));
        let mut p = parts(http::Method::GET, "https://acct.blob.core.windows.net/c1");

        signer
            .sign_request(&Context::new(), &mut p, 0)
            .await
            .unwrap();

        assert_eq!(p.headers[header::AUTHORIZATION], "Bearer token");
    }

    #[tokio::test]
    async fn test_anonymous_and_invalid() {
        let mut p = parts(http::Method::GET, "https://acct.blob.core.windows.net/c1");
        RequestSigner::default()
            .sign_request(&Context::new(), &mut p, 0)
            .await
            .unwrap();
        assert!(!p.headers.contains_key(header::AUTHORIZATION));

        let err = RequestSigner::new(Some(Credential::with_sas_token("")))
            .sign_request(&Context::new(), &mut p, 0)
            .await
            .unwrap_err();
        assert!(err.is_usage_error());
    }
}
