// fc-proxy/src/lib.rs
// ============================================================================
// Module: FailCore Proxy Library
// Description: The transparent egress proxy: forwarding, enrichment, streaming tee.
// Purpose: Forward tool-call upstream traffic while recording and
//          enriching an `EGRESS_EVENT` trace for every exchange.
// Dependencies: fc-core, fc-taint, fc-trace, crate::{error, upstream,
//               enrich, tee, server}
// ============================================================================

//! ## Overview
//! `fc-proxy` is the only asynchronous crate in this workspace. An
//! embedder builds a [`server::ProxyState`] around an [`upstream::UpstreamClient`]
//! and a shared `fc_trace::TraceWriter`, then calls [`server::serve`] (or
//! mounts [`server::build_router`] into its own `axum` app). Every
//! forwarded request gets a `pre_call` and `post_call` (or, for streaming
//! responses, a stream of) `EGRESS_EVENT`; enrichment and tracing never
//! affect the response the client receives.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod enrich;
pub mod error;
pub mod server;
pub mod tee;
pub mod upstream;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use enrich::DlpEnricher;
pub use enrich::EnrichContext;
pub use enrich::Enricher;
pub use enrich::TaintEnricher;
pub use enrich::UsageEnricher;
pub use error::ProxyError;
pub use error::UpstreamError;
pub use server::ProxyState;
pub use server::build_router;
pub use server::serve;
pub use tee::Tee;
pub use tee::TeeFinding;
pub use upstream::EgressBody;
pub use upstream::EgressRequest;
pub use upstream::EgressResponse;
pub use upstream::ReqwestUpstreamClient;
pub use upstream::UpstreamClient;
