//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building one pooled HTTP client with the browser header set
//! - GET requests with query parameters
//! - Retry logic with exponential backoff for transient failures
//! - Streaming bodies so media never has to sit fully in memory
//! - An idle timeout on every read, so a slow but live transfer is never cut off
//!
//! Everything above this layer talks to the [`Transport`] trait, so tests can swap
//! in a mock server or a canned transport.

use crate::config::HttpConfig;
use crate::TransportError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

/// Chunked response body
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// A successful (2xx) response whose body has not been read yet
pub struct FetchedResponse {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    body: BodyStream,
}

impl FetchedResponse {
    pub fn new(
        url: impl Into<String>,
        status: u16,
        content_type: Option<String>,
        body: BodyStream,
    ) -> Self {
        Self {
            url: url.into(),
            status,
            content_type,
            body,
        }
    }

    /// Builds a response around an in-memory body
    pub fn from_bytes(
        url: impl Into<String>,
        status: u16,
        content_type: Option<String>,
        body: impl Into<Bytes>,
    ) -> Self {
        let chunk: Bytes = body.into();
        Self::new(
            url,
            status,
            content_type,
            Box::pin(stream::once(async move { Ok(chunk) })),
        )
    }

    /// Reads the whole body and decodes it as UTF-8 (lossy)
    pub async fn text(self) -> Result<String, TransportError> {
        let mut buf = BytesMut::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Hands out the body stream for chunk-by-chunk consumption
    pub fn into_stream(self) -> BodyStream {
        self.body
    }
}

impl std::fmt::Debug for FetchedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchedResponse")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Issues GET requests on behalf of the crawl components
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url` with the given query parameters
    ///
    /// Returns only 2xx responses; anything else is a [`TransportError`] once the
    /// implementation's retry budget is spent.
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<FetchedResponse, TransportError>;
}

/// Retry budget and backoff schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Seconds multiplied by `2^(attempt - 1)` between attempts
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_factor: config.backoff_factor.max(0.0),
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        Duration::from_secs_f64(self.backoff_factor * 2f64.powi(exponent))
    }

    /// Statuses worth another attempt
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 429 | 500 | 502 | 503 | 504)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The HTTP configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(TransportError)` - A header value was invalid or the TLS backend failed
///
/// # Example
///
/// ```no_run
/// use bbc_harvest::config::HttpConfig;
/// use bbc_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language)
            .map_err(|e| TransportError::Client(format!("accept-language: {}", e)))?,
    );
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

    if config.accept_invalid_certs {
        warn!("TLS certificate validation is disabled (http.accept-invalid-certs = true)");
    }

    // Accept-Encoding is negotiated by reqwest itself since gzip/brotli are enabled
    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| TransportError::Client(e.to_string()))
}

/// reqwest-backed transport with retry and backoff
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Return the response |
/// | HTTP 429, 500, 502, 503, 504 | Retry with backoff |
/// | Other HTTP status | Fail immediately |
/// | Timeout / connect / send error | Retry with backoff |
/// | Budget spent | `RetriesExhausted` |
///
/// The read timeout bounds the wait for response headers and for each body chunk,
/// never the transfer as a whole.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    policy: RetryPolicy,
    read_timeout: Duration,
}

impl HttpTransport {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            read_timeout: Duration::from_secs(HttpConfig::default().timeout_secs),
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Builds the client and retry policy from configuration
    pub fn from_config(config: &HttpConfig) -> Result<Self, TransportError> {
        let transport = Self::new(build_http_client(config)?, RetryPolicy::from_config(config));
        Ok(transport.with_read_timeout(Duration::from_secs(config.timeout_secs)))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn fetched_response(&self, response: reqwest::Response) -> FetchedResponse {
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = with_idle_timeout(
            response.bytes_stream(),
            final_url.clone(),
            self.read_timeout,
        );

        FetchedResponse::new(final_url, status, content_type, body)
    }
}

/// Wraps a body stream so that each chunk must arrive within `idle`
///
/// The stream ends after the first error it yields.
fn with_idle_timeout<S, E>(inner: S, url: String, idle: Duration) -> BodyStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = Some(Box::pin(inner));
    Box::pin(stream::unfold(state, move |state| {
        let url = url.clone();
        async move {
            let mut inner = state?;
            match tokio::time::timeout(idle, inner.next()).await {
                Ok(None) => None,
                Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(inner))),
                Ok(Some(Err(e))) => {
                    let error = TransportError::Body {
                        url,
                        message: e.to_string(),
                    };
                    Some((Err(error), None))
                }
                Err(_) => {
                    let error = TransportError::Body {
                        url,
                        message: format!("no data received for {:?}", idle),
                    };
                    Some((Err(error), None))
                }
            }
        }
    }))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<FetchedResponse, TransportError> {
        let max_attempts = self.policy.max_attempts;
        let mut last_failure = String::new();

        for attempt in 1..=max_attempts {
            debug!("GET {} (attempt {}/{})", url, attempt, max_attempts);

            let request = self.client.get(url).query(query).send();
            match tokio::time::timeout(self.read_timeout, request).await {
                Err(_) => {
                    last_failure = format!("no response within {:?}", self.read_timeout);
                    warn!(
                        "Request to {} timed out (attempt {}/{})",
                        url, attempt, max_attempts
                    );
                }
                Ok(Ok(response)) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(self.fetched_response(response));
                    }

                    if !RetryPolicy::is_retryable_status(status.as_u16()) {
                        return Err(TransportError::Status {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }

                    last_failure = describe_status(status);
                    warn!(
                        "Retryable {} for {} (attempt {}/{})",
                        last_failure, url, attempt, max_attempts
                    );
                }
                Ok(Err(e)) if e.is_timeout() || e.is_connect() || e.is_request() => {
                    last_failure = e.to_string();
                    warn!(
                        "Request to {} failed (attempt {}/{}): {}",
                        url, attempt, max_attempts, e
                    );
                }
                Ok(Err(e)) => {
                    return Err(TransportError::Network {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                }
            }

            if attempt < max_attempts {
                let delay = self.policy.backoff(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }

        Err(TransportError::RetriesExhausted {
            url: url.to_string(),
            attempts: max_attempts,
            last: last_failure,
        })
    }
}

fn describe_status(status: StatusCode) -> String {
    format!("HTTP {}", status.as_u16())
}
