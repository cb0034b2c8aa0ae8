//! Error types for the request execution core.
//!
//! Every failure surfaces through the single [`Error`] enum so resource
//! accessors have one uniform failure channel. Errors preserve the raw
//! response body and the structured platform error (code, message, refId)
//! whenever the server provided one.

use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};

/// The structured error object the platform returns in JSON failure bodies.
///
/// Wire shape: `{"errorCode": 4001, "message": "...", "refId": "..."}`.
/// The `refId` is a correlation id suitable for support tickets; it is not
/// always present. Fields missing from an otherwise valid JSON body are
/// default-populated, so a code of 0 means the server sent no code (and the
/// failure is never retryable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("error {error_code}: {message}")]
pub struct ApiError {
    /// The platform's numeric error code. 0 when absent from the body.
    #[serde(default)]
    pub error_code: i64,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Correlation id, when the server included one.
    pub ref_id: Option<String>,
}

/// The main error type for request execution.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No HTTP response was obtained at all (connection refused, DNS failure,
    /// TLS failure, timeout at the socket level). Never retried.
    #[error("connection error: {0}")]
    Connectivity(#[from] reqwest::Error),

    /// The logical request carried an HTTP method outside
    /// {GET, POST, PUT, DELETE}. This is a configuration mistake, not a
    /// server condition.
    #[error("request method {0} is not supported")]
    UnsupportedMethod(http::Method),

    /// The server answered with a non-OK status. Carries the failing
    /// response as-is, plus the parsed [`ApiError`] when the body was JSON.
    #[error("HTTP error {status}: {raw_response}")]
    Http {
        /// The HTTP status code.
        status: StatusCode,
        /// The raw response body.
        raw_response: String,
        /// The response headers.
        headers: HeaderMap,
        /// The structured platform error, when the body was parseable JSON.
        error: Option<ApiError>,
    },

    /// A retryable server error persisted until the wall-clock retry budget
    /// would have been exceeded by the next backoff.
    #[error("retry budget exhausted after {attempts} attempts: {last}")]
    RetryBudgetExhausted {
        /// Wire attempts made before giving up.
        attempts: u32,
        /// The last HTTP failure observed.
        last: Box<Error>,
    },

    /// A response body could not be materialized into the expected shape.
    /// Always fatal, never silently swallowed.
    #[error("failed to deserialize response: {detail}")]
    Deserialization {
        /// The raw body that failed to deserialize.
        raw_body: String,
        /// The serde error message.
        detail: String,
    },

    /// The request body could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),

    /// Invalid client or request configuration (bad header, missing base
    /// URL, unbuildable HTTP client).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A multipart upload file could not be read.
    #[error("failed to read upload file {path:?}: {source}")]
    FileRead {
        /// Path of the file that could not be read.
        path: std::path::PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The caller's cancellation token fired before the request completed.
    /// Distinct from budget exhaustion.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// Returns `true` if this failure carries an error code the platform
    /// documents as transient (see [`crate::retry::RETRYABLE_ERROR_CODES`]).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http {
                error: Some(api), ..
            } => crate::retry::RETRYABLE_ERROR_CODES.contains(&api.error_code),
            _ => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::RetryBudgetExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error preserved one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Http { raw_response, .. } => Some(raw_response),
            Error::Deserialization { raw_body, .. } => Some(raw_body),
            Error::RetryBudgetExhausted { last, .. } => last.raw_response(),
            _ => None,
        }
    }

    /// Returns the structured platform error if the server provided one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Http { error, .. } => error.as_ref(),
            Error::RetryBudgetExhausted { last, .. } => last.api_error(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for request execution.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http_error(code: i64) -> Error {
        Error::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            raw_response: String::new(),
            headers: HeaderMap::new(),
            error: Some(ApiError {
                error_code: code,
                message: "boom".to_string(),
                ref_id: None,
            }),
        }
    }

    #[test]
    fn retryability_follows_the_error_code_allow_list() {
        assert!(http_error(4001).is_retryable());
        assert!(http_error(4004).is_retryable());
        assert!(!http_error(4005).is_retryable());
        assert!(!http_error(1006).is_retryable());
    }

    #[test]
    fn budget_exhaustion_exposes_the_last_failure() {
        let err = Error::RetryBudgetExhausted {
            attempts: 3,
            last: Box::new(http_error(4002)),
        };
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.api_error().unwrap().error_code, 4002);
    }

    #[test]
    fn api_error_parses_the_wire_shape() {
        let parsed: ApiError =
            serde_json::from_str(r#"{"errorCode":4001,"message":"Rate limited","refId":"abc123"}"#)
                .unwrap();
        assert_eq!(parsed.error_code, 4001);
        assert_eq!(parsed.message, "Rate limited");
        assert_eq!(parsed.ref_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn api_error_default_populates_missing_fields() {
        let parsed: ApiError = serde_json::from_str(r#"{"message":"oops"}"#).unwrap();
        assert_eq!(parsed.error_code, 0);
        assert_eq!(parsed.message, "oops");
        assert_eq!(parsed.ref_id, None);

        let bare: ApiError = serde_json::from_str("{}").unwrap();
        assert_eq!(bare.error_code, 0);
        assert!(bare.message.is_empty());
    }
}
