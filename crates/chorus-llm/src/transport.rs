//! HTTP boundary between adapters and the network

use std::time::Duration;

use async_trait::async_trait;
use chorus_config::HttpConfig;
use futures_util::StreamExt;
use http::{HeaderMap, StatusCode};
use reqwest::Client;

use crate::error::LlmError;
use crate::provider::WireRequest;
use crate::sse::ByteStream;

/// Response head plus a lazily consumed body
pub struct WireResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Body chunks in arrival order
    pub body: ByteStream,
}

impl WireResponse {
    /// Read the remaining body to a string
    ///
    /// # Errors
    ///
    /// Returns the first transport error raised while reading
    pub async fn text(mut self) -> Result<String, LlmError> {
        let mut buffer = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl std::fmt::Debug for WireResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WireResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Sends wire requests; implemented over HTTP and by test doubles
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST a request and return as soon as the response head arrives
    async fn send(&self, request: WireRequest) -> Result<WireResponse, LlmError>;
}

/// `reqwest`-backed transport sharing one connection pool across targets
///
/// `timeout` bounds the wait for the response head and, separately, every
/// gap between body chunks. A stream that keeps producing data is never cut
/// off, however long it runs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from HTTP settings
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` if the TLS backend cannot be initialised
    pub fn new(config: &HttpConfig) -> Result<Self, LlmError> {
        Self::with_timeouts(config.timeout, config.connect_timeout)
    }

    /// Build a transport with explicit timeouts
    ///
    /// # Errors
    ///
    /// Returns `RequestFailed` if the TLS backend cannot be initialised
    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .read_timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("chorus/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LlmError::RequestFailed(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, LlmError> {
        let pending = self
            .client
            .post(request.url)
            .headers(request.headers)
            .json(&request.body)
            .send();

        let response = tokio::time::timeout(self.timeout, pending)
            .await
            .map_err(|_| LlmError::RequestFailed(format!("no response within {:?}", self.timeout)))??;

        let status = response.status();
        let headers = response.headers().clone();
        let body: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| LlmError::RequestFailed(format!("response body interrupted: {e}")))),
        );

        Ok(WireResponse { status, headers, body })
    }
}
