// fc-pipeline/src/error.rs
// ============================================================================
// Module: FailCore Pipeline Errors
// Description: Infrastructure-level failure modes for a run.
// Purpose: Distinguish run setup/teardown failures from per-step outcomes.
// Dependencies: fc-policy, fc-replay, fc-trace
// ============================================================================

//! ## Overview
//! Step failures never raise to the caller: a failing tool,
//! a denied policy, a semantic violation, all become a [`fc_core::StepResult`]
//! with a non-`Ok` status. [`PipelineError`] is reserved for the narrower
//! set of things that prevent a run from starting or from recording its
//! own trace at all — policy load failures, trace writer open failures,
//! and historical-trace read failures when a replayer is configured.

use thiserror::Error;

/// Errors that prevent a run from being constructed or from completing
/// its own bookkeeping, as opposed to a step's own outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The layered policy could not be loaded.
    #[error("failed to load policy: {0}")]
    Policy(#[from] fc_policy::PolicyError),
    /// The trace file could not be opened for writing.
    #[error("failed to open trace: {0}")]
    Trace(#[from] fc_trace::TraceError),
    /// The historical trace for a configured replayer could not be read.
    #[error("failed to build replay index: {0}")]
    Replay(#[from] fc_replay::ReplayError),
    /// A validator id collided while registering built-ins or plugins.
    #[error("duplicate validator id: {0}")]
    DuplicateValidator(#[from] fc_validate::DuplicateValidatorId),
    /// A semantic rule id collided while registering built-ins or plugins.
    #[error("duplicate semantic rule id: {0}")]
    DuplicateRule(#[from] fc_semantic::DuplicateRuleId),
    /// The run's sandbox directory could not be created.
    #[error("failed to prepare sandbox directory: {0}")]
    Sandbox(String),
}
