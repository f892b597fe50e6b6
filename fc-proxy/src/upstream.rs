// fc-proxy/src/upstream.rs
// ============================================================================
// Module: Upstream Client
// Description: Abstraction over the HTTP client used to forward egress
//              requests to a provider.
// Purpose: Let the proxy server swap in a mock client for tests without
//          touching the handler.
// Dependencies: reqwest, async-trait, bytes
// ============================================================================

//! ## Overview
//! [`UpstreamClient`] is the trait the proxy's forward handler calls
//! through; [`ReqwestUpstreamClient`] is the only production
//! implementation, backed by `reqwest` so the crate never hand-rolls
//! HTTP/TLS. A response whose `Content-Type` is `text/event-stream` is
//! returned as [`EgressBody::Streaming`] so the handler can tee it;
//! everything else is buffered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::Method;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::error::UpstreamError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

// ============================================================================
// SECTION: Request / Response
// ============================================================================

/// One request to forward to an upstream provider.
#[derive(Debug, Clone)]
pub struct EgressRequest {
    /// HTTP method of the original client request.
    pub method: Method,
    /// Fully-resolved upstream URL.
    pub url: String,
    /// Headers to forward, already stripped of hop-by-hop and
    /// FailCore-internal headers by the caller.
    pub headers: HeaderMap,
    /// Request body, buffered (the proxy never streams a request body).
    pub body: Bytes,
}

/// An upstream response body: buffered for ordinary responses, a boxed
/// byte stream for `text/event-stream` responses.
pub enum EgressBody {
    /// A fully-read response body.
    Buffered(Bytes),
    /// A streaming response body, not yet read.
    Streaming(BoxStream<'static, Result<Bytes, UpstreamError>>),
}

/// One upstream response.
pub struct EgressResponse {
    /// HTTP status code returned by the upstream.
    pub status: u16,
    /// Response headers as returned by the upstream.
    pub headers: HeaderMap,
    /// `Content-Type` header value, if present, cached for routing
    /// between the streaming and buffered paths.
    pub content_type: Option<String>,
    /// The response body.
    pub body: EgressBody,
}

impl EgressResponse {
    /// `true` when this response's `Content-Type` marks it as a
    /// server-sent-events stream.
    #[must_use]
    pub fn is_event_stream(&self) -> bool {
        self.content_type.as_deref().is_some_and(|value| value.starts_with(EVENT_STREAM_CONTENT_TYPE))
    }
}

// ============================================================================
// SECTION: UpstreamClient
// ============================================================================

/// Forwards one [`EgressRequest`] to its upstream target.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Forwards `request`, returning the upstream's response.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] when the request cannot be sent or the
    /// upstream connection fails; a non-2xx status is still `Ok` (the
    /// proxy forwards the upstream's status verbatim).
    async fn forward(&self, request: EgressRequest) -> Result<EgressResponse, UpstreamError>;
}

/// Default [`UpstreamClient`], backed by `reqwest`.
pub struct ReqwestUpstreamClient {
    client: reqwest::Client,
}

impl ReqwestUpstreamClient {
    /// Builds a client with the default upstream timeout.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if the underlying `reqwest` client
    /// cannot be constructed (e.g. the platform's TLS backend fails to
    /// initialize).
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Builds a client with a caller-supplied upstream timeout.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if the underlying `reqwest` client
    /// cannot be constructed.
    pub fn with_timeout(timeout: Duration) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|error| UpstreamError::Transport(error.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstreamClient {
    async fn forward(&self, request: EgressRequest) -> Result<EgressResponse, UpstreamError> {
        let response = self
            .client
            .request(request.method, request.url.as_str())
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|error| UpstreamError::Transport(error.to_string()))?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_type = headers.get(reqwest::header::CONTENT_TYPE).and_then(|value| value.to_str().ok()).map(str::to_string);
        let is_stream = content_type.as_deref().is_some_and(|value| value.starts_with(EVENT_STREAM_CONTENT_TYPE));

        let body = if is_stream {
            let stream = response.bytes_stream().map(|chunk| chunk.map_err(|error| UpstreamError::Transport(error.to_string())));
            EgressBody::Streaming(Box::pin(stream))
        } else {
            let bytes = response.bytes().await.map_err(|error| UpstreamError::Transport(error.to_string()))?;
            EgressBody::Buffered(bytes)
        };

        Ok(EgressResponse { status, headers, content_type, body })
    }
}
