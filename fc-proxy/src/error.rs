// fc-proxy/src/error.rs
// ============================================================================
// Module: FailCore Proxy Errors
// Description: Failure modes for upstream forwarding and server setup.
// Purpose: Distinguish transport-level failures from the fail-open
//          enrichment/tracing path, which never raises.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Enricher and trace failures are swallowed and
//! never reach a caller. [`UpstreamError`] and [`ProxyError`] are reserved
//! for the narrower set of things that prevent a request from being
//! forwarded at all, or the server from starting.

use thiserror::Error;

/// Failure forwarding a request to the configured upstream.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The underlying HTTP client could not complete the request.
    #[error("upstream request failed: {0}")]
    Transport(String),
    /// The upstream target could not be built into a valid URL.
    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),
}

/// Failure starting or running the proxy server itself.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The listen address could not be bound.
    #[error("failed to bind proxy listener: {0}")]
    Bind(String),
    /// The server loop exited with an I/O error.
    #[error("proxy server failed: {0}")]
    Serve(String),
}
