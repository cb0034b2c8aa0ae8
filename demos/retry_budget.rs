//! Tune the retry budget and watch attempts in the tracing output.
//!
//! Run with `RUST_LOG=sheetwire=info cargo run --example retry_budget`.

use sheetwire::{CancellationToken, Client, Method};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), sheetwire::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Client::builder()
        .base_url("https://api.example.com/2.0/")?
        .access_token(std::env::var("API_TOKEN").unwrap_or_default())
        .max_retry_timeout(Duration::from_secs(5))
        .build()?;

    let request = client
        .request(Method::Get, "sheets")?
        .with_query_param("pageSize", "10");

    // Abandon the whole request, backoffs included, after ten seconds.
    let token = CancellationToken::new();
    let guard = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        guard.cancel();
    });

    match client.execute_cancellable(&request, &token).await {
        Ok(envelope) => println!(
            "status {}, {} body bytes",
            envelope.status,
            envelope.body_bytes().len()
        ),
        Err(err) => eprintln!("gave up: {err}"),
    }

    Ok(())
}
