//! Fetch the calling user's profile with a configured client.
//!
//! Run with `API_TOKEN=... cargo run --example basic_call`.

use serde_json::Value;
use sheetwire::Client;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), sheetwire::Error> {
    let client = Client::builder()
        .base_url("https://api.example.com/2.0/")?
        .access_token(std::env::var("API_TOKEN").unwrap_or_default())
        .timeout(Duration::from_secs(30))
        .build()?;

    match client.get::<Value>("users/me").await {
        Ok(response) => {
            println!(
                "status {} after {} attempt(s) in {:?}",
                response.status, response.attempts, response.latency
            );
            println!("{}", response.raw_body);
        }
        Err(err) => eprintln!("request failed: {err}"),
    }

    Ok(())
}
