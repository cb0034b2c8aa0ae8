//! The request execution client: retry loop, backoff budget, typed helpers.
//!
//! [`Client`] is the entry point. Build one per API authority with
//! [`ClientBuilder`] and reuse it; the configuration and connection pool are
//! shared read-only behind an `Arc`, so concurrent logical requests from
//! different tasks execute fully independently.

use crate::cancel::CancellationToken;
use crate::codec::{DefaultCodec, JsonCodec};
use crate::request::{Entity, Method, MultipartPayload, RequestDescriptor};
use crate::response::{Response, ResponseEnvelope};
use crate::retry::{self, Classification, Decision, RetryState, DEFAULT_MAX_RETRY_TIMEOUT};
use crate::shapes::PaginatedResult;
use crate::transport::Transport;
use crate::{Error, Result};
use http::{header, HeaderMap, HeaderName, HeaderValue};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// A client for one API authority, with transient-error retry under a
/// wall-clock backoff budget.
///
/// Cloning is cheap and shares the same transport and configuration.
///
/// # Examples
///
/// ```no_run
/// use sheetwire::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct UserProfile {
///     id: u64,
///     email: String,
/// }
///
/// # async fn example() -> Result<(), sheetwire::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com/2.0/")?
///     .access_token("secret-token")
///     .build()?;
///
/// let me: sheetwire::Response<UserProfile> = client.get("users/me").await?;
/// println!("{} ({} attempt(s), {:?})", me.data.email, me.attempts, me.latency);
/// # Ok(())
/// # }
/// ```
pub struct Client<C: JsonCodec = DefaultCodec> {
    inner: Arc<ClientInner<C>>,
}

impl<C: JsonCodec> Clone for Client<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ClientInner<C: JsonCodec> {
    transport: Transport,
    base_url: Url,
    default_headers: HeaderMap,
    max_retry_timeout: Duration,
    codec: C,
}

impl Client {
    /// Creates a new [`ClientBuilder`] with the default JSON codec.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<C: JsonCodec> Client<C> {
    /// Executes a logical request with retry enabled.
    ///
    /// Transient failures (allow-listed error codes in a JSON failure body)
    /// are retried under exponential backoff until the next backoff would
    /// exceed the configured wall-clock budget. Connectivity failures and
    /// non-retryable server errors surface immediately.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<ResponseEnvelope> {
        self.execute_inner(request, None)
            .await
            .map(|(envelope, _attempts)| envelope)
    }

    /// Like [`Self::execute`], but abandons the loop when `token` fires.
    ///
    /// Cancellation is checked at loop entry and raced against the backoff
    /// sleep; it surfaces as [`Error::Cancelled`], distinct from budget
    /// exhaustion.
    pub async fn execute_cancellable(
        &self,
        request: &RequestDescriptor,
        token: &CancellationToken,
    ) -> Result<ResponseEnvelope> {
        self.execute_inner(request, Some(token))
            .await
            .map(|(envelope, _attempts)| envelope)
    }

    /// Executes a multipart file upload in a single attempt.
    ///
    /// Uploads are assumed non-idempotent, so there is no retry: any
    /// failure, transient or not, surfaces immediately.
    pub async fn execute_multipart(
        &self,
        request: &RequestDescriptor,
        payload: &MultipartPayload,
    ) -> Result<ResponseEnvelope> {
        let started = Instant::now();
        let envelope = self.inner.transport.send_multipart(request, payload).await?;
        tracing::info!(
            method = %request.method(),
            uri = %request.uri(),
            status = envelope.status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            attempt = 1u32,
            "multipart request completed"
        );

        if envelope.status == http::StatusCode::OK {
            return Ok(envelope);
        }

        // Same body classification as the retry path; only the retry itself
        // is skipped, so a malformed JSON error body is still fatal here.
        let api_error = match retry::classify(&envelope, &self.inner.codec)? {
            Classification::Retryable(error) => Some(error),
            Classification::NotRetryable(error) => error,
        };
        Err(envelope.into_error(api_error))
    }

    /// The retry loop. Attempts are strictly sequential; the wire request
    /// is rebuilt from the descriptor on every attempt. Returns the
    /// envelope plus the number of wire attempts made.
    async fn execute_inner(
        &self,
        request: &RequestDescriptor,
        token: Option<&CancellationToken>,
    ) -> Result<(ResponseEnvelope, u32)> {
        let mut state = RetryState::new(self.inner.max_retry_timeout);

        loop {
            if let Some(token) = token {
                if token.is_cancelled() {
                    return Err(Error::Cancelled);
                }
            }

            let attempt_started = Instant::now();
            let envelope = self.inner.transport.send(request).await?;
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                status = envelope.status.as_u16(),
                duration_ms = attempt_started.elapsed().as_millis() as u64,
                attempt = state.attempts(),
                "request completed"
            );

            if envelope.status == http::StatusCode::OK {
                return Ok((envelope, state.attempts()));
            }

            match retry::classify(&envelope, &self.inner.codec)? {
                Classification::NotRetryable(api_error) => {
                    return Err(envelope.into_error(api_error));
                }
                Classification::Retryable(api_error) => match state.next_delay() {
                    Decision::Retry { backoff } => {
                        tracing::warn!(
                            error_code = api_error.error_code,
                            status = envelope.status.as_u16(),
                            backoff_ms = backoff.as_millis() as u64,
                            attempt = state.attempts(),
                            "transient server error, retrying after backoff"
                        );
                        self.backoff(backoff, token).await?;
                        state.advance();
                    }
                    Decision::BudgetExhausted => {
                        tracing::warn!(
                            error_code = api_error.error_code,
                            attempts = state.attempts(),
                            "retry budget exhausted, surfacing last failure"
                        );
                        return Err(Error::RetryBudgetExhausted {
                            attempts: state.attempts(),
                            last: Box::new(envelope.into_error(Some(api_error))),
                        });
                    }
                },
            }
        }
    }

    /// Sleeps for the backoff, waking early on cancellation.
    async fn backoff(&self, delay: Duration, token: Option<&CancellationToken>) -> Result<()> {
        match token {
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => Ok(()),
                    _ = token.cancelled() => Err(Error::Cancelled),
                }
            }
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    /// Builds a descriptor for `path` relative to the base URL, carrying
    /// the client's default headers (including authorization).
    pub fn request(&self, method: Method, path: &str) -> Result<RequestDescriptor> {
        let uri = self.inner.base_url.join(path)?;
        Ok(RequestDescriptor::new(method, uri)
            .with_header_map(self.inner.default_headers.clone()))
    }

    /// GET a single object.
    pub async fn get<Res>(&self, path: &str) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let request = self.request(Method::Get, path)?;
        self.call(request).await
    }

    /// POST a JSON body, materializing a single object from the response.
    pub async fn post<Req, Res>(&self, path: &str, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let request = self
            .request(Method::Post, path)?
            .with_entity(self.json_entity(body)?);
        self.call(request).await
    }

    /// PUT a JSON body, materializing a single object from the response.
    pub async fn put<Req, Res>(&self, path: &str, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let request = self
            .request(Method::Put, path)?
            .with_entity(self.json_entity(body)?);
        self.call(request).await
    }

    /// DELETE, materializing a single object from the response.
    pub async fn delete<Res>(&self, path: &str) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let request = self.request(Method::Delete, path)?;
        self.call(request).await
    }

    /// GET a JSON array, preserving server order.
    pub async fn get_list<Res>(&self, path: &str) -> Result<Response<Vec<Res>>>
    where
        Res: DeserializeOwned,
    {
        let request = self.request(Method::Get, path)?;
        let started = Instant::now();
        let (envelope, attempts) = self.execute_inner(&request, None).await?;
        let data = self.inner.codec.deserialize_list(envelope.body_bytes())?;
        Ok(self.wrap(data, envelope, started.elapsed(), attempts))
    }

    /// GET a paginated wrapper: data array plus page metadata.
    pub async fn get_paginated<Res>(&self, path: &str) -> Result<Response<PaginatedResult<Res>>>
    where
        Res: DeserializeOwned,
    {
        let request = self.request(Method::Get, path)?;
        let started = Instant::now();
        let (envelope, attempts) = self.execute_inner(&request, None).await?;
        let data = self
            .inner
            .codec
            .deserialize_paginated(envelope.body_bytes())?;
        Ok(self.wrap(data, envelope, started.elapsed(), attempts))
    }

    /// The codec this client serializes and materializes with.
    pub fn codec(&self) -> &C {
        &self.inner.codec
    }

    async fn call<Res>(&self, request: RequestDescriptor) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let started = Instant::now();
        let (envelope, attempts) = self.execute_inner(&request, None).await?;
        let data = self.inner.codec.deserialize(envelope.body_bytes())?;
        Ok(self.wrap(data, envelope, started.elapsed(), attempts))
    }

    fn wrap<T>(
        &self,
        data: T,
        envelope: ResponseEnvelope,
        latency: Duration,
        attempts: u32,
    ) -> Response<T> {
        let raw_body = envelope.text();
        Response::new(
            data,
            raw_body,
            envelope.status,
            envelope.headers,
            latency,
            attempts,
        )
    }

    fn json_entity<Req: Serialize>(&self, body: &Req) -> Result<Entity> {
        Ok(Entity::json(self.inner.codec.serialize(body)?))
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use sheetwire::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), sheetwire::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com/2.0/")?
///     .access_token("secret-token")
///     .max_retry_timeout(Duration::from_secs(30))
///     .user_agent("sheet-sync/1.4")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder<C: JsonCodec = DefaultCodec> {
    base_url: Option<Url>,
    access_token: Option<String>,
    user_agent: String,
    timeout: Option<Duration>,
    max_retry_timeout: Duration,
    default_headers: HeaderMap,
    codec: C,
}

impl ClientBuilder {
    /// Creates a builder with the default codec, user agent, and a 15
    /// second retry budget.
    pub fn new() -> Self {
        Self {
            base_url: None,
            access_token: None,
            user_agent: concat!("sheetwire/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: None,
            max_retry_timeout: DEFAULT_MAX_RETRY_TIMEOUT,
            default_headers: HeaderMap::new(),
            codec: DefaultCodec,
        }
    }
}

impl<C: JsonCodec> ClientBuilder<C> {
    /// Sets the base URL all relative paths resolve against.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the bearer access token, sent as `Authorization: Bearer <token>`
    /// on requests built through the typed helpers and [`Client::request`].
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Overrides the `User-Agent` string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets a per-attempt socket timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the wall-clock retry budget, measured from the first attempt.
    /// Defaults to 15 seconds.
    pub fn max_retry_timeout(mut self, budget: Duration) -> Self {
        self.max_retry_timeout = budget;
        self
    }

    /// Adds a header included on all requests built through the typed
    /// helpers and [`Client::request`].
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Swaps in a custom JSON codec.
    pub fn codec<D: JsonCodec>(self, codec: D) -> ClientBuilder<D> {
        ClientBuilder {
            base_url: self.base_url,
            access_token: self.access_token,
            user_agent: self.user_agent,
            timeout: self.timeout,
            max_retry_timeout: self.max_retry_timeout,
            default_headers: self.default_headers,
            codec,
        }
    }

    /// Builds the configured [`Client`].
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided, the access token is
    /// not a valid header value, or the HTTP client cannot be constructed.
    pub fn build(self) -> Result<Client<C>> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("base URL is required".to_string()))?;

        let transport = Transport::new(&self.user_agent, self.timeout)?;

        let mut default_headers = self.default_headers;
        if let Some(token) = &self.access_token {
            let mut value = HeaderValue::try_from(format!("Bearer {}", token))
                .map_err(|e| Error::Configuration(format!("invalid access token: {}", e)))?;
            value.set_sensitive(true);
            default_headers.insert(header::AUTHORIZATION, value);
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                default_headers,
                max_retry_timeout: self.max_retry_timeout,
                codec: self.codec,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
