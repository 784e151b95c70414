use anyhow::Result;
use azstore_core::Context;
use azstore_http_send_reqwest::ReqwestHttpSend;
use azstore_sleep_tokio::TokioSleep;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .user_agent("azstore-example/0.1")
        .build()?;

    let ctx = Context::new()
        .with_http_send(ReqwestHttpSend::new(client))
        .with_sleep(TokioSleep);

    // Anonymous requests against a private account come back as 4xx, which
    // is still a response: only transport failures are errors.
    let account = std::env::var("AZURE_STORAGE_ACCOUNT_NAME")
        .unwrap_or_else(|_| "devstoreaccount1".to_string());
    let req = http::Request::get(format!("https://{account}.blob.core.windows.net/?comp=list"))
        .header("x-ms-version", "2021-08-06")
        .body(Bytes::new())?;

    match ctx.http_send(req).await {
        Ok(resp) => {
            println!("Response status: {}", resp.status());
            for (name, value) in resp.headers() {
                println!("  {name}: {value:?}");
            }
        }
        Err(e) => eprintln!("Request failed: {e}"),
    }

    Ok(())
}
