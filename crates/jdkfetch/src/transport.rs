//! HTTP transport used to talk to the release API and download archives.
//!
//! The pipeline only needs `GET url -> (status, body stream)`, so the
//! transport is a small trait. [`ReqwestTransport`] is the production
//! implementation; tests plug in their own.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::FetcherConfig;
use crate::{Error, Result};

/// Streaming response body.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// A response with a streaming body.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Value of the `Content-Length` header, if any.
    pub content_length: Option<u64>,
    url: String,
    body: ByteStream,
    idle_timeout: Option<Duration>,
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl HttpResponse {
    /// Create a response from a body stream.
    #[must_use]
    pub fn new(url: impl Into<String>, status: u16, body: ByteStream) -> Self {
        Self {
            status,
            content_length: None,
            url: url.into(),
            body,
            idle_timeout: None,
        }
    }

    /// Create a response whose body is a single in-memory buffer.
    #[must_use]
    pub fn from_bytes(url: impl Into<String>, status: u16, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let len = body.len() as u64;
        let body = stream::once(async move { Ok::<_, Error>(body) }).boxed();
        let mut response = Self::new(url, status, body);
        response.content_length = Some(len);
        response
    }

    /// Fail a chunk read that stalls for longer than `timeout`.
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The requested URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Read the next body chunk, or `None` at the end of the body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the idle timeout elapses and
    /// [`Error::Network`] if the underlying stream fails.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        let next = match self.idle_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.body.next())
                .await
                .map_err(|_| Error::Timeout {
                    url: self.url.clone(),
                    timeout_secs: timeout.as_secs(),
                })?,
            None => self.body.next().await,
        };
        next.transpose()
    }

    /// Read the whole body into memory.
    ///
    /// # Errors
    ///
    /// See [`HttpResponse::chunk`].
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }
}

/// The `fetch(url) -> status, body` capability.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET request.
    ///
    /// Non-success statuses are returned as responses, not errors; only
    /// transport failures are errors.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
    token: Option<String>,
}

impl ReqwestTransport {
    /// Create a transport from the fetcher configuration.
    ///
    /// A GitHub token is picked up from `GITHUB_TOKEN` or `GH_TOKEN` to raise
    /// API rate limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the HTTP client cannot be built.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .or_else(|_| std::env::var("GH_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());
        Self::with_token(config, token)
    }

    /// Create a transport with an explicit (optional) bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the HTTP client cannot be built.
    pub fn with_token(config: &FetcherConfig, token: Option<String>) -> Result<Self> {
        let timeout = config.timeout();
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(timeout)
            .build()
            .map_err(|e| {
                Error::network(&config.api_base, format!("failed to create HTTP client: {e}"))
            })?;
        Ok(Self {
            client,
            timeout,
            token,
        })
    }

    fn map_error(&self, url: &str, err: &reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::network(url, err.to_string())
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        debug!(%url, "HTTP GET");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| Error::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| self.map_error(url, &e))?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        debug!(%url, status, ?content_length, "HTTP response");

        let this = self.clone();
        let owned_url = url.to_string();
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| this.map_error(&owned_url, &e)))
            .boxed();

        let mut response = HttpResponse::new(url, status, body).with_idle_timeout(self.timeout);
        response.content_length = content_length;
        Ok(response)
    }
}
