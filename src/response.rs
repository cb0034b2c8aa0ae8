//! Raw response envelopes and the typed response wrapper.
//!
//! [`ResponseEnvelope`] is what one wire attempt produces: status, headers,
//! and an optional body entity. Exactly one envelope exists per attempt.
//! [`Response`] wraps a materialized value together with transaction
//! metadata (latency, attempt count) for the typed convenience methods.

use crate::error::{ApiError, Error};
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A response body entity: content type, byte length, and the raw bytes.
#[derive(Debug, Clone)]
pub struct HttpEntity {
    /// The response content type, when the server declared one.
    pub content_type: Option<String>,
    /// Byte length of the fully-read body.
    pub content_length: u64,
    /// The raw body bytes.
    pub content: Vec<u8>,
}

impl HttpEntity {
    /// Returns `true` if the declared content type is JSON.
    ///
    /// An absent content type counts as not JSON; the error classifier must
    /// not trust the body shape without one.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"))
    }
}

/// The raw result of one wire attempt.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The body entity; `None` when the response had no body.
    pub entity: Option<HttpEntity>,
}

impl ResponseEnvelope {
    /// The body bytes, or an empty slice when there is no entity.
    pub fn body_bytes(&self) -> &[u8] {
        self.entity.as_ref().map(|e| e.content.as_slice()).unwrap_or(&[])
    }

    /// The body as lossy UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.body_bytes()).into_owned()
    }

    /// Converts a failing envelope into [`Error::Http`], preserving the
    /// response as-is plus the structured error when one was parsed.
    pub fn into_error(self, error: Option<ApiError>) -> Error {
        let raw_response = self.text();
        Error::Http {
            status: self.status,
            raw_response,
            headers: self.headers,
            error,
        }
    }
}

/// A materialized response plus transaction metadata.
///
/// Returned by the typed convenience methods ([`crate::Client::get`] and
/// friends). Derefs to the materialized data.
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The materialized response data.
    pub data: T,

    /// The raw response body as a string, preserved for debugging.
    pub raw_body: String,

    /// The HTTP status code.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Total latency including all retry attempts and backoff delays.
    pub latency: Duration,

    /// Wire attempts made; `1` when the request succeeded first try.
    pub attempts: u32,
}

impl<T> Response<T> {
    /// Wraps materialized data with its transaction metadata.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: u32,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the data to a different type, preserving the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the request needed more than one wire attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name, when present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
