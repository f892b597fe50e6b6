// fc-proxy/src/server.rs
// ============================================================================
// Module: Proxy Server
// Description: The transparent egress proxy's HTTP surface.
// Purpose: Accept POST /<provider>/<endpoint>, forward to the matching
//          upstream, enrich and trace the exchange, and return the
//          upstream's response verbatim.
// Dependencies: axum, tokio, fc-trace, crate::{upstream, enrich, tee, error}
// ============================================================================

//! ## Overview
//! [`ProxyState`] holds everything a request handler needs: the
//! [`UpstreamClient`], a provider-to-base-URL routing table (how
//! provider names resolve to hosts is left to the embedder to
//! configure), the shared [`TraceWriter`], and the
//! enricher chain. [`handle_forward`] is the only route; it is
//! deliberately thin, delegating the streaming-vs-buffered split to
//! [`crate::tee`] and [`crate::enrich`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::any;
use bytes::Bytes;
use fc_trace::TraceWriter;
use serde_json::Value;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

use crate::enrich::EnrichContext;
use crate::enrich::Enricher;
use crate::enrich::default_enrichers;
use crate::enrich::run_enrichers;
use crate::error::ProxyError;
use crate::tee;
use crate::upstream::EgressBody;
use crate::upstream::EgressRequest;
use crate::upstream::UpstreamClient;

const HEADER_PROVIDER: &str = "x-failcore-provider";
const HEADER_RUN_ID: &str = "x-failcore-run-id";
const HEADER_STEP_ID: &str = "x-failcore-step-id";

/// Headers stripped before forwarding: hop-by-hop headers and the
/// proxy's own internal correlation headers.
const STRIPPED_REQUEST_HEADERS: &[&str] = &["host", "connection", "content-length", HEADER_PROVIDER, HEADER_RUN_ID, HEADER_STEP_ID];

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state for every proxy request.
pub struct ProxyState {
    upstream: Arc<dyn UpstreamClient>,
    trace: Arc<TraceWriter>,
    enrichers: Vec<Box<dyn Enricher>>,
    strict_streaming: bool,
    provider_bases: BTreeMap<String, String>,
}

impl ProxyState {
    /// Builds proxy state with the default enricher chain.
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamClient>, trace: Arc<TraceWriter>, provider_bases: BTreeMap<String, String>, strict_streaming: bool) -> Self {
        Self { upstream, trace, enrichers: default_enrichers(), strict_streaming, provider_bases }
    }

    /// Overrides the enricher chain (for tests, or an embedder that
    /// wants a narrower set).
    #[must_use]
    pub fn with_enrichers(mut self, enrichers: Vec<Box<dyn Enricher>>) -> Self {
        self.enrichers = enrichers;
        self
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the proxy's router: a single catch-all route under
/// `/{provider}/{*endpoint}`.
#[must_use]
pub fn build_router(state: Arc<ProxyState>) -> Router {
    Router::new().route("/{provider}/{*endpoint}", any(handle_forward)).with_state(state)
}

/// Binds `addr` and serves the proxy until the process is signaled to
/// stop.
///
/// # Errors
///
/// Returns [`ProxyError::Bind`] if the address cannot be bound, or
/// [`ProxyError::Serve`] if the server loop exits with an I/O error.
pub async fn serve(addr: SocketAddr, state: Arc<ProxyState>) -> Result<(), ProxyError> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|error| ProxyError::Bind(error.to_string()))?;
    let app = build_router(state);
    axum::serve(listener, app.into_make_service()).await.map_err(|error| ProxyError::Serve(error.to_string()))
}

// ============================================================================
// SECTION: Handler
// ============================================================================

async fn handle_forward(State(state): State<Arc<ProxyState>>, Path((provider, endpoint)): Path<(String, String)>, method: Method, headers: HeaderMap, body: Bytes) -> Response {
    let run_id = header_str(&headers, HEADER_RUN_ID);
    let step_id = header_str(&headers, HEADER_STEP_ID);
    let declared_provider = header_str(&headers, HEADER_PROVIDER).unwrap_or_else(|| provider.clone());

    let Some(base) = state.provider_bases.get(&provider) else {
        return (StatusCode::BAD_GATEWAY, format!("unknown provider '{provider}'")).into_response();
    };
    let url = format!("{}/{}", base.trim_end_matches('/'), endpoint.trim_start_matches('/'));

    state.trace.emit(
        fc_core::LogLevel::Info,
        fc_core::EventBody::new(fc_core::EventType::EgressEvent).with_data(json!({
            "phase": "pre_call",
            "method": method.as_str(),
            "url": url,
            "provider": declared_provider,
            "run_id": run_id,
            "step_id": step_id,
        })),
    );

    let forward_headers = filtered_headers(&headers);
    let request_body_preview = body_preview(&body);
    let request = EgressRequest { method: method.clone(), url: url.clone(), headers: forward_headers, body };

    let response = match state.upstream.forward(request).await {
        Ok(response) => response,
        Err(error) => {
            state.trace.emit(
                fc_core::LogLevel::Warn,
                fc_core::EventBody::new(fc_core::EventType::EgressEvent).with_data(json!({
                    "phase": "post_call",
                    "url": url,
                    "provider": declared_provider,
                    "error": error.to_string(),
                })),
            );
            return (StatusCode::BAD_GATEWAY, error.to_string()).into_response();
        }
    };

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    let response_headers = response.headers.clone();

    match response.body {
        EgressBody::Buffered(bytes) => {
            let mut context = EnrichContext::new(declared_provider, None);
            context.evidence.insert("request_body".to_string(), Value::String(String::from_utf8_lossy(&request_body_preview).into_owned()));
            context.evidence.insert("response".to_string(), json!({"body": String::from_utf8_lossy(&bytes)}));
            run_enrichers(&state.enrichers, &mut context);
            state.trace.emit(
                fc_core::LogLevel::Info,
                fc_core::EventBody::new(fc_core::EventType::EgressEvent).with_data(json!({
                    "phase": "post_call",
                    "url": url,
                    "status": status.as_u16(),
                    "evidence": context.evidence,
                })),
            );
            let mut builder = Response::builder().status(status);
            for (name, value) in response_headers.iter() {
                builder = builder.header(name.clone(), value.clone());
            }
            builder.body(Body::from(bytes)).unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        EgressBody::Streaming(stream) => {
            let tee::Tee { forwarded, findings } = tee::spawn_tee(stream, state.strict_streaming);
            spawn_finding_drain(Arc::clone(&state), url.clone(), declared_provider.clone(), findings);

            let body_stream = ReceiverStream::new(forwarded);
            let mut builder = Response::builder().status(status);
            for (name, value) in response_headers.iter() {
                builder = builder.header(name.clone(), value.clone());
            }
            builder.body(Body::from_stream(body_stream)).unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

/// Drains the tee's finding channel, emitting one `EGRESS_EVENT` per
/// finding. Runs independently of the response so scanning is never on
/// the forwarding path.
fn spawn_finding_drain(state: Arc<ProxyState>, url: String, provider: String, mut findings: tokio::sync::mpsc::Receiver<tee::TeeFinding>) {
    tokio::spawn(async move {
        while let Some(finding) = findings.recv().await {
            let level = if finding.violation { fc_core::LogLevel::Error } else { fc_core::LogLevel::Warn };
            state.trace.emit(
                level,
                fc_core::EventBody::new(fc_core::EventType::EgressEvent).with_data(json!({
                    "phase": "post_call",
                    "url": url,
                    "provider": provider,
                    "dlp_hits": finding.hits,
                    "violation": finding.violation,
                })),
            );
        }
    });
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_string)
}

fn filtered_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers.iter() {
        if STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (HeaderName::from_bytes(name.as_str().as_bytes()), HeaderValue::from_bytes(value.as_bytes())) {
            forwarded.append(name, value);
        }
    }
    forwarded
}

/// Bounded preview of a request body for DLP evidence, capped well
/// below the enricher's own scan bound.
fn body_preview(bytes: &Bytes) -> Bytes {
    const MAX_PREVIEW: usize = 4096;
    if bytes.len() <= MAX_PREVIEW { bytes.clone() } else { bytes.slice(0..MAX_PREVIEW) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    #[test]
    fn stripped_headers_excludes_correlation_headers() {
        assert!(STRIPPED_REQUEST_HEADERS.contains(&HEADER_RUN_ID));
        assert!(STRIPPED_REQUEST_HEADERS.contains(&HEADER_STEP_ID));
        assert!(STRIPPED_REQUEST_HEADERS.contains(&HEADER_PROVIDER));
    }

    #[test]
    fn body_preview_caps_large_bodies() {
        let bytes = Bytes::from(vec![b'a'; 10_000]);
        let preview = body_preview(&bytes);
        assert_eq!(preview.len(), 4096);
    }
}
