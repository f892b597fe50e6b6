// failcore/src/lib.rs
// ============================================================================
// Module: FailCore Root Facade
// Description: Public API surface composing every FailCore crate.
// Purpose: Give an embedder one dependency and one import path instead of
//          nine path-scoped crates.
// Dependencies: fc-core, fc-policy, fc-validate, fc-semantic, fc-taint,
//               fc-trace, fc-replay, fc-pipeline, fc-proxy
// ============================================================================

//! ## Overview
//! `failcore` does not implement anything itself. It re-exports each
//! component crate under a short namespace (`failcore::core`,
//! `failcore::pipeline`, `failcore::proxy`, ...) and collects the types
//! an embedder touches most often into [`prelude`]. A host wiring up the
//! runtime needs exactly two things: a [`prelude::Run`] built via
//! [`prelude::Run::bootstrap`], with tools registered in a
//! [`prelude::ToolRegistry`]; everything else (policy layering,
//! validation, the semantic guard, taint tracking, replay, tracing) is
//! assembled for it. The transparent egress proxy (`failcore::proxy`) is
//! a separate, optional surface — a host that only runs the synchronous
//! pipeline never needs to depend on `tokio`.

// ============================================================================
// SECTION: Namespaced Re-Exports
// ============================================================================

/// Canonical data model: [`Step`](core::Step), [`Context`](core::Context),
/// [`Policy`](core::Policy), [`Decision`](core::Decision),
/// [`StepResult`](core::StepResult), trace event shapes, identifiers, time,
/// and deterministic fingerprinting.
pub use fc_core as core;

/// Policy loading and the three-layer (active/shadow/breakglass) merge.
pub use fc_policy as policy;

/// The validator registry and validation engine, plus built-in
/// validators.
pub use fc_validate as validate;

/// The semantic guard: AST parsing, rule registry, built-in rules.
pub use fc_semantic as semantic;

/// Taint propagation, sink evaluation, and DLP pattern scanning.
pub use fc_taint as taint;

/// The append-only trace writer and reader.
pub use fc_trace as trace;

/// The replay engine and drift detector.
pub use fc_replay as replay;

/// The seven-stage execution pipeline: [`Run`](pipeline::Run),
/// [`ToolRegistry`](pipeline::ToolRegistry), the side-effect boundary
/// gate.
pub use fc_pipeline as pipeline;

/// The transparent egress proxy: streaming tee, enrichers, the `axum`
/// HTTP surface. Asynchronous; depends on `tokio`.
pub use fc_proxy as proxy;

// ============================================================================
// SECTION: Prelude
// ============================================================================

/// The types a host embedding FailCore's synchronous pipeline reaches
/// for first. Proxy types are intentionally excluded: pulling in
/// `failcore::proxy` (and its `tokio` dependency) is an opt-in for
/// hosts that actually run the egress surface.
pub mod prelude {
    pub use fc_core::Context;
    pub use fc_core::Decision;
    pub use fc_core::Policy;
    pub use fc_core::Step;
    pub use fc_core::StepError;
    pub use fc_core::StepId;
    pub use fc_core::StepOutput;
    pub use fc_core::StepResult;
    pub use fc_core::StepStatus;
    pub use fc_pipeline::PipelineError;
    pub use fc_pipeline::Run;
    pub use fc_pipeline::SideEffectBoundary;
    pub use fc_pipeline::ToolError;
    pub use fc_pipeline::ToolFn;
    pub use fc_pipeline::ToolRegistry;
    pub use fc_policy::FailcoreLayout;
    pub use fc_replay::ReplayMode;
}
