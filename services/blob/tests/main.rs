use std::collections::{HashMap, VecDeque};
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use azstore_blob::{
    AccessCondition, BlobContainerPermissions, BlobListingDetails, BlobServiceClient, Credential,
    ListBlobItem, PublicAccess, SharedAccessPolicy,
};
use azstore_core::retry::{LinearRetry, NoRetry};
use azstore_core::{
    Context, ErrorKind, HttpSend, LocationMode, OperationContext, OsEnv, RequestOptions,
    StorageLocation, StorageUri,
};
use azstore_http_send_reqwest::ReqwestHttpSend;
use azstore_sleep_tokio::TokioSleep;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use futures::{StreamExt, TryStreamExt};
use http::{Method, StatusCode};
use log::warn;
use pretty_assertions::assert_eq;

/// What the mock saw of one request.
#[derive(Debug, Clone)]
struct Sent {
    method: Method,
    uri: String,
    headers: http::HeaderMap,
    body: Bytes,
}

/// Answers requests with a script of responses, in order.
#[derive(Debug, Clone, Default)]
struct ScriptedHttpSend {
    responses: Arc<Mutex<VecDeque<http::Response<Bytes>>>>,
    sent: Arc<Mutex<Vec<Sent>>>,
}

impl ScriptedHttpSend {
    fn reply(self, status: StatusCode, headers: &[(&str, &str)], body: &str) -> Self {
        let mut builder = http::Response::builder().status(status);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        let resp = builder
            .body(Bytes::copy_from_slice(body.as_bytes()))
            .unwrap();
        self.responses.lock().unwrap().push_back(resp);
        self
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSend for ScriptedHttpSend {
    async fn http_send(
        &self,
        req: http::Request<Bytes>,
    ) -> azstore_core::Result<http::Response<Bytes>> {
        self.sent.lock().unwrap().push(Sent {
            method: req.method().clone(),
            uri: req.uri().to_string(),
            headers: req.headers().clone(),
            body: req.body().clone(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| azstore_core::Error::network("script exhausted"))
    }
}

fn init_client(http: &ScriptedHttpSend) -> BlobServiceClient {
    let _ = env_logger::builder().is_test(true).try_init();

    BlobServiceClient::new(
        Context::new().with_http_send(http.clone()),
        StorageUri::parse(
            "https://acct.blob.core.windows.net",
            Some("https://acct-secondary.blob.core.windows.net"),
        )
        .unwrap(),
        Some(Credential::with_shared_key("acct", "c2VjcmV0")),
    )
    .with_default_options(
        RequestOptions::new().with_retry_policy(LinearRetry::new(Duration::ZERO, 3)),
    )
}

fn blob_page(names: &[&str], next_marker: Option<&str>) -> String {
    let blobs: String = names
        .iter()
        .map(|name| {
            format!(
                "<Blob><Name>{name}</Name><Properties>\
                 <Last-Modified>Thu, 01 Jul 2021 10:44:59 GMT</Last-Modified>\
                 <Etag>0x8D93C7D4629C7D9</Etag>\
                 <Content-Length>8</Content-Length>\
                 </Properties></Blob>"
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <EnumerationResults ContainerName=\"c1\"><Blobs>{blobs}</Blobs>\
         <NextMarker>{}</NextMarker></EnumerationResults>",
        next_marker.unwrap_or_default()
    )
}

#[tokio::test]
async fn test_create_if_not_exists() -> Result<()> {
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::NOT_FOUND, &[("x-ms-error-code", "ContainerNotFound")], "")
        .reply(
            StatusCode::CREATED,
            &[
                ("etag", "\"0x1\""),
                ("last-modified", "Tue, 01 Mar 2022 08:12:34 GMT"),
            ],
            "",
        );
    let client = init_client(&http);
    let mut container = client.container("c1")?;
    container.set_metadata(HashMap::from([("owner".to_string(), "ops".to_string())]));

    let mut op_ctx = OperationContext::new();
    assert!(
        container
            .create_if_not_exists(PublicAccess::Blob, None, &mut op_ctx)
            .await?
    );
    assert_eq!(container.properties().etag.as_deref(), Some("\"0x1\""));
    assert_eq!(container.properties().public_access, PublicAccess::Blob);

    let sent = http.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].method, Method::HEAD);
    assert_eq!(
        sent[0].uri,
        "https://acct.blob.core.windows.net/c1?restype=container"
    );
    assert_eq!(sent[1].method, Method::PUT);
    assert_eq!(sent[1].headers["x-ms-meta-owner"], "ops");
    assert_eq!(sent[1].headers["x-ms-blob-public-access"], "blob");
    for s in &sent {
        assert_eq!(s.headers["x-ms-version"], "2021-08-06");
        assert_eq!(
            s.headers["x-ms-client-request-id"],
            op_ctx.client_request_id()
        );
        assert!(s.headers["authorization"]
            .to_str()?
            .starts_with("SharedKey acct:"));
    }
    Ok(())
}

#[tokio::test]
async fn test_create_if_not_exists_conflict() -> Result<()> {
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::NOT_FOUND, &[], "")
        .reply(
            StatusCode::CONFLICT,
            &[("x-ms-error-code", "ContainerAlreadyExists")],
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>ContainerAlreadyExists</Code><Message>The specified container already exists.</Message></Error>",
        );
    let client = init_client(&http);
    let mut container = client.container("c1")?;

    let created = container
        .create_if_not_exists(PublicAccess::Off, None, &mut OperationContext::new())
        .await?;
    assert!(!created);
    // A conflict is not retried.
    assert_eq!(http.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_delete_if_exists_when_missing() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(StatusCode::NOT_FOUND, &[], "");
    let client = init_client(&http);
    let mut container = client.container("c1")?;

    assert!(
        !container
            .delete_if_exists(None, None, &mut OperationContext::new())
            .await?
    );
    assert_eq!(http.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_delete_if_exists() -> Result<()> {
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::OK, &[("etag", "\"0x1\"")], "")
        .reply(StatusCode::ACCEPTED, &[], "");
    let client = init_client(&http);
    let mut container = client.container("c1")?;

    assert!(
        container
            .delete_if_exists(None, None, &mut OperationContext::new())
            .await?
    );
    assert_eq!(http.sent()[1].method, Method::DELETE);
    Ok(())
}

#[tokio::test]
async fn test_download_attributes() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(
        StatusCode::OK,
        &[
            ("etag", "\"0x2\""),
            ("last-modified", "Tue, 01 Mar 2022 08:12:34 GMT"),
            ("x-ms-meta-env", "prod"),
            ("x-ms-lease-status", "unlocked"),
        ],
        "",
    );
    let client = init_client(&http);
    let mut container = client.container("c1")?;

    container
        .download_attributes(None, None, &mut OperationContext::new())
        .await?;
    assert_eq!(container.metadata().get("env").map(|v| v.as_str()), Some("prod"));
    assert_eq!(container.properties().lease_status.as_deref(), Some("unlocked"));
    Ok(())
}

#[tokio::test]
async fn test_download_attributes_of_missing_container() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(
        StatusCode::NOT_FOUND,
        &[("x-ms-error-code", "ContainerNotFound")],
        "",
    );
    let client = init_client(&http);
    let mut container = client.container("c1")?;
    let mut op_ctx = OperationContext::new();

    let err = container
        .download_attributes(None, None, &mut op_ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Service);
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.error_code(), Some("ContainerNotFound"));
    // 404 from the primary is final.
    assert_eq!(op_ctx.request_results().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_upload_metadata() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(StatusCode::OK, &[("etag", "\"0x3\"")], "");
    let client = init_client(&http);
    let mut container = client.container("c1")?;
    container.set_metadata(HashMap::from([("team".to_string(), "storage".to_string())]));

    container
        .upload_metadata(None, None, &mut OperationContext::new())
        .await?;

    let sent = http.sent();
    assert_eq!(
        sent[0].uri,
        "https://acct.blob.core.windows.net/c1?restype=container&comp=metadata"
    );
    assert_eq!(sent[0].headers["x-ms-meta-team"], "storage");
    assert_eq!(container.properties().etag.as_deref(), Some("\"0x3\""));
    Ok(())
}

#[tokio::test]
async fn test_delete_sends_access_condition() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(StatusCode::ACCEPTED, &[], "");
    let client = init_client(&http);
    let container = client.container("c1")?;
    let condition = AccessCondition::new()
        .with_lease_id("lease-1")
        .with_if_unmodified_since(Utc.with_ymd_and_hms(2022, 3, 1, 8, 12, 34).unwrap());

    container
        .delete(Some(&condition), None, &mut OperationContext::new())
        .await?;

    let sent = http.sent();
    assert_eq!(sent[0].headers["x-ms-lease-id"], "lease-1");
    assert_eq!(
        sent[0].headers["if-unmodified-since"],
        "Tue, 01 Mar 2022 08:12:34 GMT"
    );
    Ok(())
}

#[tokio::test]
async fn test_download_permissions() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(
        StatusCode::OK,
        &[
            ("etag", "\"0x4\""),
            ("last-modified", "Tue, 01 Mar 2022 08:12:34 GMT"),
            ("x-ms-blob-public-access", "container"),
        ],
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><SignedIdentifiers>\
         <SignedIdentifier><Id>reader</Id><AccessPolicy>\
         <Expiry>2022-03-02T08:12:34.0000000Z</Expiry><Permission>rl</Permission>\
         </AccessPolicy></SignedIdentifier></SignedIdentifiers>",
    );
    let client = init_client(&http);
    let mut container = client.container("c1")?;

    let permissions = container
        .download_permissions(None, None, &mut OperationContext::new())
        .await?;

    assert_eq!(permissions.public_access, PublicAccess::Container);
    let reader = &permissions.shared_access_policies["reader"];
    assert!(reader.permissions.read && reader.permissions.list);
    assert!(!reader.permissions.write);
    assert_eq!(container.properties().public_access, PublicAccess::Container);
    assert_eq!(container.properties().etag.as_deref(), Some("\"0x4\""));

    let sent = http.sent();
    assert_eq!(sent[0].method, Method::GET);
    assert_eq!(
        sent[0].uri,
        "https://acct.blob.core.windows.net/c1?restype=container&comp=acl"
    );
    assert!(sent[0].body.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_upload_permissions_signs_body() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(StatusCode::OK, &[("etag", "\"0x5\"")], "");
    let client = init_client(&http);
    let mut container = client.container("c1")?;
    let permissions = BlobContainerPermissions {
        public_access: PublicAccess::Blob,
        shared_access_policies: [(
            "writer".to_string(),
            SharedAccessPolicy {
                permissions: "w".parse()?,
                ..Default::default()
            },
        )]
        .into_iter()
        .collect(),
    };

    container
        .upload_permissions(&permissions, None, None, &mut OperationContext::new())
        .await?;

    let sent = http.sent();
    assert_eq!(sent[0].method, Method::PUT);
    assert_eq!(
        sent[0].uri,
        "https://acct.blob.core.windows.net/c1?restype=container&comp=acl"
    );
    assert_eq!(sent[0].headers["x-ms-blob-public-access"], "blob");
    assert!(sent[0].headers["authorization"]
        .to_str()?
        .starts_with("SharedKey acct:"));

    let body = std::str::from_utf8(&sent[0].body)?;
    assert!(body.contains("<Id>writer</Id>"), "{body}");
    assert!(body.contains("<Permission>w</Permission>"), "{body}");
    assert_eq!(container.properties().public_access, PublicAccess::Blob);
    assert_eq!(container.properties().etag.as_deref(), Some("\"0x5\""));
    Ok(())
}

#[tokio::test]
async fn test_acquire_lease() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(
        StatusCode::CREATED,
        &[("etag", "\"0x6\""), ("x-ms-lease-id", "lease-1")],
        "",
    );
    let client = init_client(&http);
    let mut container = client.container("c1")?;

    let lease_id = container
        .acquire_lease(Some(30), Some("lease-1"), None, None, &mut OperationContext::new())
        .await?;
    assert_eq!(lease_id, "lease-1");
    assert_eq!(container.properties().etag.as_deref(), Some("\"0x6\""));

    let sent = http.sent();
    assert_eq!(sent[0].method, Method::PUT);
    assert_eq!(
        sent[0].uri,
        "https://acct.blob.core.windows.net/c1?comp=lease&restype=container"
    );
    assert_eq!(sent[0].headers["x-ms-lease-action"], "acquire");
    assert_eq!(sent[0].headers["x-ms-lease-duration"], "30");
    assert_eq!(sent[0].headers["x-ms-proposed-lease-id"], "lease-1");
    Ok(())
}

#[tokio::test]
async fn test_lease_with_wrong_status_is_retried() -> Result<()> {
    // Acquire expects 201, a 200 is not accepted as success.
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::OK, &[], "")
        .reply(StatusCode::CREATED, &[("x-ms-lease-id", "lease-2")], "");
    let client = init_client(&http);
    let mut container = client.container("c1")?;

    let lease_id = container
        .acquire_lease(None, None, None, None, &mut OperationContext::new())
        .await?;
    assert_eq!(lease_id, "lease-2");

    let sent = http.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].headers["x-ms-lease-duration"], "-1");
    Ok(())
}

#[tokio::test]
async fn test_renew_release_and_change_lease() -> Result<()> {
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::OK, &[("x-ms-lease-id", "lease-1")], "")
        .reply(StatusCode::OK, &[("x-ms-lease-id", "lease-2")], "")
        .reply(StatusCode::OK, &[], "");
    let client = init_client(&http);
    let mut container = client.container("c1")?;
    let mut op_ctx = OperationContext::new();

    let leased = AccessCondition::new().with_lease_id("lease-1");
    container.renew_lease(&leased, None, &mut op_ctx).await?;
    let new_id = container
        .change_lease("lease-2", &leased, None, &mut op_ctx)
        .await?;
    assert_eq!(new_id, "lease-2");
    container
        .release_lease(&AccessCondition::new().with_lease_id(new_id), None, &mut op_ctx)
        .await?;

    let sent = http.sent();
    let actions: Vec<_> = sent
        .iter()
        .map(|s| s.headers["x-ms-lease-action"].to_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, vec!["renew", "change", "release"]);
    assert_eq!(sent[0].headers["x-ms-lease-id"], "lease-1");
    assert_eq!(sent[1].headers["x-ms-proposed-lease-id"], "lease-2");
    assert_eq!(sent[2].headers["x-ms-lease-id"], "lease-2");
    Ok(())
}

#[tokio::test]
async fn test_break_lease() -> Result<()> {
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::ACCEPTED, &[("x-ms-lease-time", "12")], "")
        .reply(StatusCode::ACCEPTED, &[], "");
    let client = init_client(&http);
    let mut container = client.container("c1")?;
    let mut op_ctx = OperationContext::new();

    let remaining = container
        .break_lease(Some(20), None, None, &mut op_ctx)
        .await?;
    assert_eq!(remaining, Some(Duration::from_secs(12)));

    let remaining = container.break_lease(None, None, None, &mut op_ctx).await?;
    assert_eq!(remaining, None);

    let sent = http.sent();
    assert_eq!(sent[0].headers["x-ms-lease-action"], "break");
    assert_eq!(sent[0].headers["x-ms-lease-break-period"], "20");
    assert!(!sent[1].headers.contains_key("x-ms-lease-break-period"));
    Ok(())
}

#[tokio::test]
async fn test_release_lease_needs_lease_id() -> Result<()> {
    let http = ScriptedHttpSend::default();
    let client = init_client(&http);
    let mut container = client.container("c1")?;

    let err = container
        .release_lease(&AccessCondition::new(), None, &mut OperationContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
    assert!(http.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_list_blobs_pages_lazily() -> Result<()> {
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::OK, &[], &blob_page(&["a", "b"], Some("m1")))
        .reply(StatusCode::OK, &[], &blob_page(&["c"], None));
    let client = init_client(&http);
    let container = client.container("c1")?;

    let stream = container.list_blobs(Some("a b"), false, BlobListingDetails::default(), None)?;
    futures::pin_mut!(stream);

    assert_eq!(stream.next().await.unwrap()?.name(), "a");
    assert_eq!(stream.next().await.unwrap()?.name(), "b");
    assert_eq!(http.sent().len(), 1);

    assert_eq!(stream.next().await.unwrap()?.name(), "c");
    assert!(stream.next().await.is_none());

    let sent = http.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].uri,
        "https://acct.blob.core.windows.net/c1?restype=container&comp=list&prefix=a%20b&delimiter=/"
    );
    assert_eq!(
        sent[1].uri,
        "https://acct.blob.core.windows.net/c1?restype=container&comp=list&prefix=a%20b&delimiter=/&marker=m1"
    );
    Ok(())
}

#[tokio::test]
async fn test_list_blobs_retries_on_secondary_and_stays_there() -> Result<()> {
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::SERVICE_UNAVAILABLE, &[], "")
        .reply(StatusCode::OK, &[], &blob_page(&["a"], Some("m1")))
        .reply(StatusCode::OK, &[], &blob_page(&["b"], None));
    let client = init_client(&http);
    let container = client.container("c1")?;
    let options = RequestOptions::new().with_location_mode(LocationMode::PrimaryThenSecondary);

    let mut op_ctx = OperationContext::new();
    let page = container
        .list_blobs_segmented(
            None,
            true,
            BlobListingDetails::default(),
            Some(1),
            None,
            Some(&options),
            &mut op_ctx,
        )
        .await?;

    let token = page.continuation_token().cloned().unwrap();
    assert_eq!(token.next_marker(), "m1");
    assert_eq!(token.target_location(), Some(StorageLocation::Secondary));
    assert_eq!(page.page_size(), Some(1));
    assert_eq!(op_ctx.request_results().len(), 2);

    let page = container
        .list_blobs_segmented(
            None,
            true,
            BlobListingDetails::default(),
            Some(1),
            Some(&token),
            Some(&options),
            &mut OperationContext::new(),
        )
        .await?;
    assert!(!page.has_more_results());
    assert!(matches!(&page.results()[0], ListBlobItem::Blob(b) if b.name == "b"));

    let hosts: Vec<_> = http
        .sent()
        .iter()
        .map(|s| s.uri.parse::<http::Uri>().unwrap().host().unwrap().to_string())
        .collect();
    assert_eq!(
        hosts,
        vec![
            "acct.blob.core.windows.net",
            "acct-secondary.blob.core.windows.net",
            "acct-secondary.blob.core.windows.net",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_list_containers() -> Result<()> {
    let page = |names: &[&str], marker: &str| {
        let containers: String = names
            .iter()
            .map(|name| {
                format!(
                    "<Container><Name>{name}</Name><Properties>\
                     <Last-Modified>Thu, 01 Jul 2021 10:44:59 GMT</Last-Modified>\
                     <Etag>\"0x1\"</Etag></Properties></Container>"
                )
            })
            .collect();
        format!(
            "<EnumerationResults><Containers>{containers}</Containers>\
             <NextMarker>{marker}</NextMarker></EnumerationResults>"
        )
    };
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::OK, &[], &page(&["c1", "c2"], "/acct/c3"))
        .reply(StatusCode::OK, &[], &page(&["c3"], ""));
    let client = init_client(&http);

    let names: Vec<String> = client
        .list_containers(Some("c"), true, None)
        .map_ok(|c| c.name)
        .try_collect()
        .await?;
    assert_eq!(names, vec!["c1", "c2", "c3"]);
    assert_eq!(
        http.sent()[1].uri,
        "https://acct.blob.core.windows.net/?comp=list&prefix=c&marker=/acct/c3&include=metadata"
    );
    Ok(())
}

#[tokio::test]
async fn test_server_errors_are_retried() -> Result<()> {
    let http = ScriptedHttpSend::default()
        .reply(StatusCode::INTERNAL_SERVER_ERROR, &[], "")
        .reply(StatusCode::SERVICE_UNAVAILABLE, &[("x-ms-error-code", "ServerBusy")], "")
        .reply(StatusCode::ACCEPTED, &[], "");
    let client = init_client(&http);
    let container = client.container("c1")?;

    let mut op_ctx = OperationContext::new();
    container.delete(None, None, &mut op_ctx).await?;

    let statuses: Vec<_> = op_ctx
        .request_results()
        .iter()
        .map(|r| r.status)
        .collect();
    assert_eq!(
        statuses,
        vec![
            Some(StatusCode::INTERNAL_SERVER_ERROR),
            Some(StatusCode::SERVICE_UNAVAILABLE),
            Some(StatusCode::ACCEPTED),
        ]
    );
    assert_eq!(op_ctx.request_results()[1].error_code.as_deref(), Some("ServerBusy"));
    Ok(())
}

#[tokio::test]
async fn test_no_retry_surfaces_first_error() -> Result<()> {
    let http = ScriptedHttpSend::default().reply(StatusCode::INTERNAL_SERVER_ERROR, &[], "");
    let client = init_client(&http);
    let container = client.container("c1")?;
    let options = RequestOptions::new().with_retry_policy(NoRetry);

    let err = container
        .delete(None, Some(&options), &mut OperationContext::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(http.sent().len(), 1);
    Ok(())
}

fn init_live_client() -> Option<BlobServiceClient> {
    let _ = env_logger::builder().is_test(true).try_init();
    let _ = dotenv::dotenv();

    if env::var("AZSTORE_BLOB_TEST").ok().as_deref() != Some("on") {
        return None;
    }

    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::default())
        .with_sleep(TokioSleep)
        .with_env(OsEnv);
    Some(BlobServiceClient::from_env(ctx).expect("blob client must be configured from env"))
}

#[tokio::test]
async fn test_live_container_lifecycle() -> Result<()> {
    let Some(client) = init_live_client() else {
        warn!("AZSTORE_BLOB_TEST is not set, skipped");
        return Ok(());
    };

    let name = format!("azstore-{}", Utc::now().timestamp_millis());
    let mut container = client.container(&name)?;
    let mut op_ctx = OperationContext::new();

    assert!(!container.exists(None, None, &mut op_ctx).await?);
    assert!(
        container
            .create_if_not_exists(PublicAccess::Off, None, &mut op_ctx)
            .await?
    );
    assert!(
        !container
            .create_if_not_exists(PublicAccess::Off, None, &mut op_ctx)
            .await?
    );

    let blobs: Vec<_> = container
        .list_blobs(None, true, BlobListingDetails::default(), None)?
        .try_collect()
        .await?;
    assert!(blobs.is_empty());

    let lease_id = container
        .acquire_lease(Some(15), None, None, None, &mut op_ctx)
        .await?;
    let leased = AccessCondition::new().with_lease_id(lease_id);
    assert!(container.delete(None, None, &mut op_ctx).await.is_err());

    assert!(
        container
            .delete_if_exists(Some(&leased), None, &mut op_ctx)
            .await?
    );
    Ok(())
}
