//! Transport adapter over `reqwest`.
//!
//! One [`Transport`] owns one long-lived `reqwest::Client` (connection pool
//! included) shared by every request the [`crate::Client`] makes. Each call
//! here is a single wire attempt; retry policy lives upstream in the client.

use crate::request::{MultipartPayload, RequestDescriptor};
use crate::response::{HttpEntity, ResponseEnvelope};
use crate::{Error, Result};
use http::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

pub(crate) struct Transport {
    http: reqwest::Client,
}

impl Transport {
    /// Builds the underlying HTTP client once. The user agent is installed
    /// here so every attempt carries it without per-request bookkeeping.
    pub(crate) fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    /// Performs one wire attempt for the descriptor.
    ///
    /// Headers and body are re-applied fresh from the descriptor on every
    /// call; nothing survives between attempts except the pooled client.
    pub(crate) async fn send(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope> {
        let mut builder = self
            .http
            .request(request.method().as_http(), request.uri().clone());

        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }

        if let Some(entity) = request.entity() {
            builder = builder
                .header(CONTENT_TYPE, entity.content_type.as_str())
                .body(entity.content.clone());
        }

        self.dispatch(builder).await
    }

    /// Performs one multipart wire attempt: the file in a part named
    /// `file`, plus any JSON entity in a part named by the lower-cased
    /// object-type tag.
    pub(crate) async fn send_multipart(
        &self,
        request: &RequestDescriptor,
        payload: &MultipartPayload,
    ) -> Result<ResponseEnvelope> {
        let file_bytes = tokio::fs::read(&payload.file_path)
            .await
            .map_err(|source| Error::FileRead {
                path: payload.file_path.clone(),
                source,
            })?;
        let file_name = payload
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_owned());

        let part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(&payload.file_content_type)
            .map_err(|e| {
                Error::Configuration(format!(
                    "invalid file content type {:?}: {}",
                    payload.file_content_type, e
                ))
            })?;

        let mut form = Form::new().part("file", part);
        if let Some(entity) = request.entity() {
            form = form.text(
                payload.object_type.to_lowercase(),
                String::from_utf8_lossy(&entity.content).into_owned(),
            );
        }

        let mut builder = self
            .http
            .request(request.method().as_http(), request.uri().clone());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }

        self.dispatch(builder.multipart(form)).await
    }

    /// Executes the wire call and packages status, headers, and the fully
    /// read body into an envelope. Transport-level failures (no response at
    /// all) surface as [`Error::Connectivity`] via the `From` impl.
    async fn dispatch(&self, builder: reqwest::RequestBuilder) -> Result<ResponseEnvelope> {
        let response = builder.send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await?;

        let entity = if bytes.is_empty() {
            None
        } else {
            Some(HttpEntity {
                content_type,
                content_length: bytes.len() as u64,
                content: bytes.to_vec(),
            })
        };

        Ok(ResponseEnvelope {
            status,
            headers,
            entity,
        })
    }
}
