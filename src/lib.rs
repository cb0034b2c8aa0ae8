//! # sheetwire: retry-aware request core for a sheets collaboration API
//!
//! `sheetwire` is the HTTP execution engine for a typed client of a
//! cloud collaboration platform's REST API. It turns a logical request
//! (method, target, payload) into wire calls, retries transient server
//! errors under an exponential-backoff wall-clock budget, and materializes
//! JSON response bodies into the shapes the API actually uses: a single
//! object, an ordered list, a paginated wrapper, a string-keyed map, a
//! row copy/move result, or an event-stream batch.
//!
//! Per-resource accessor layers (users, sheets, rows, ...) sit on top and
//! call through [`Client::execute`] or the typed convenience methods.
//!
//! ## Quick start
//!
//! ```no_run
//! use sheetwire::Client;
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct NewUser {
//!     email: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     email: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sheetwire::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com/2.0/")?
//!         .access_token(std::env::var("API_TOKEN").unwrap_or_default())
//!         .max_retry_timeout(Duration::from_secs(15))
//!         .build()?;
//!
//!     let me: sheetwire::Response<User> = client.get("users/me").await?;
//!     println!("{} ({} attempt(s))", me.data.email, me.attempts);
//!
//!     let users = client.get_paginated::<User>("users?pageSize=100").await?;
//!     println!("{} of {:?} users", users.data.data.len(), users.data.total_count);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retry semantics
//!
//! A failing response is retried only when all of the following hold: the
//! body is JSON, it parses as the platform's structured error, the error
//! code is on the transient allow-list ([`retry::RETRYABLE_ERROR_CODES`]),
//! and the next backoff (`2^attempt * 1000ms` plus 0-1000ms jitter) still
//! fits inside the wall-clock budget (default 15s). Everything else
//! (connectivity failures, non-JSON bodies, other error codes) surfaces
//! immediately as a single [`Error`]. Retries are invisible to callers
//! except through latency, the attempt count on [`Response`], and
//! `tracing` output.
//!
//! ## Errors
//!
//! ```no_run
//! use sheetwire::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com/")?.build()?;
//! match client.get::<serde_json::Value>("sheets/1").await {
//!     Ok(response) => println!("{:?}", response.data),
//!     Err(Error::Http { status, error, .. }) => {
//!         eprintln!("server said {} ({:?})", status, error);
//!     }
//!     Err(Error::RetryBudgetExhausted { attempts, last }) => {
//!         eprintln!("gave up after {} attempts: {}", attempts, last);
//!     }
//!     Err(e) => eprintln!("{}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod cancel;
mod client;
pub mod codec;
mod error;
pub mod request;
mod response;
pub mod retry;
pub mod shapes;
mod transport;

pub use cancel::CancellationToken;
pub use client::{Client, ClientBuilder};
pub use codec::{DefaultCodec, JsonCodec};
pub use error::{ApiError, Error, Result};
pub use request::{Entity, Method, MultipartPayload, RequestDescriptor};
pub use response::{HttpEntity, Response, ResponseEnvelope};
pub use shapes::{CopyOrMoveRowResult, EventResult, PaginatedResult, RowMapping};
