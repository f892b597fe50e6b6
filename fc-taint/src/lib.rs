// fc-taint/src/lib.rs
// ============================================================================
// Module: FailCore Taint Library
// Description: Source/sink taint tracking, DLP pattern scanning, and the
//              taint-flow validator.
// Purpose: Attribute sensitive data flow from source tools to sinks and
//          give policy a way to BLOCK/SANITIZE/REQUIRE_APPROVAL on it.
// Dependencies: fc-core, fc-validate, crate::{dlp, store, engine, validator}
// ============================================================================

//! ## Overview
//! `fc-taint` is the Taint / DLP Engine described in the runtime overview
//! [`store::TaintStore`] holds per-run taint tags;
//! [`engine::TaintEngine`] tags source outputs, propagates tags through
//! dependencies, and enforces sink policy; [`dlp`] provides the regex
//! detector registry both the engine and the egress DLP enrichment stack
//! scan with; [`validator::TaintFlowValidator`] is the
//! opt-in, always-WARN validator that surfaces taint flow findings
//! through the regular validation engine.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dlp;
pub mod engine;
pub mod store;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dlp::Detector;
pub use dlp::MAX_SCAN_CHARS;
pub use dlp::default_detectors;
pub use dlp::max_sensitivity;
pub use dlp::redact;
pub use dlp::scan;
pub use engine::DEFAULT_HIGH_RISK_SINKS;
pub use engine::SinkAction;
pub use engine::SinkVerdict;
pub use engine::TaintEngine;
pub use engine::TaintEngineConfig;
pub use store::TaintStore;
pub use validator::STATE_KEY_TAINT_TAGS;
pub use validator::TaintFlowValidator;
