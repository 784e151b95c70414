use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use azstore_core::retry::LinearRetry;
use azstore_core::Result;
use azstore_core::{
    execute, AttemptContext, Context, HttpSend, LocationMode, OperationContext,
    RequestLocationMode, RequestOptions, ResponseOutcome, SignRequest, StorageRequest, StorageUri,
};
use bytes::Bytes;
use http::request::Parts;
use http::StatusCode;

// An http client answering 503 to the first two requests
#[derive(Debug, Default)]
struct FlakyHttpSend {
    calls: AtomicU32,
}

#[async_trait]
impl HttpSend for FlakyHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        println!("--> {} {}", req.method(), req.uri());

        let status = if n < 2 {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        };
        Ok(http::Response::builder()
            .status(status)
            .body(Bytes::from_static(b"hello"))?)
    }
}

// A signer adding a static api key
#[derive(Debug)]
struct ApiKeySigner {
    api_key: String,
}

#[async_trait]
impl SignRequest for ApiKeySigner {
    async fn sign_request(&self, _: &Context, req: &mut Parts, _: u64) -> Result<()> {
        req.headers.insert("x-api-key", self.api_key.parse()?);
        Ok(())
    }
}

// Read a blob, from either endpoint
#[derive(Debug)]
struct ReadBlob {
    uri: StorageUri,
    signer: ApiKeySigner,
}

#[async_trait]
impl StorageRequest for ReadBlob {
    type Output = Bytes;

    fn storage_uri(&self) -> &StorageUri {
        &self.uri
    }

    fn location_mode(&self) -> RequestLocationMode {
        RequestLocationMode::PrimaryOrSecondary
    }

    fn build_request(&self, attempt: &AttemptContext<'_>) -> Result<http::Request<Bytes>> {
        Ok(http::Request::get(attempt.request_uri(&[])?).body(Bytes::new())?)
    }

    async fn sign_request(&self, ctx: &Context, req: &mut Parts, len: u64) -> Result<()> {
        self.signer.sign_request(ctx, req, len).await
    }

    fn pre_process_response(
        &self,
        resp: &http::Response<Bytes>,
        _: &AttemptContext<'_>,
    ) -> Result<ResponseOutcome<Self::Output>> {
        if resp.status() != StatusCode::OK {
            return Ok(ResponseOutcome::RetryableFailure);
        }
        Ok(ResponseOutcome::Success(resp.body().clone()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let ctx = Context::new().with_http_send(FlakyHttpSend::default());

    let request = ReadBlob {
        uri: StorageUri::parse(
            "https://acct.blob.core.windows.net/c1/hello.txt",
            Some("https://acct-secondary.blob.core.windows.net/c1/hello.txt"),
        )?,
        signer: ApiKeySigner {
            api_key: "demo-api-key".to_string(),
        },
    };
    let options = RequestOptions::new()
        .with_location_mode(LocationMode::PrimaryThenSecondary)
        .with_retry_policy(LinearRetry::new(Duration::from_millis(100), 3));

    let mut op_ctx = OperationContext::new();
    match execute(&ctx, &request, &options, &mut op_ctx).await {
        Ok(body) => println!("Read {} bytes", body.len()),
        Err(e) => eprintln!("Failed to read blob: {}", e),
    }

    for r in op_ctx.request_results() {
        println!("{} -> {:?}", r.target_location, r.status);
    }

    Ok(())
}
