// fc-core/src/lib.rs
// ============================================================================
// Module: FailCore Core Library
// Description: Canonical data model shared by every FailCore crate.
// Purpose: Expose Step, Context, Policy, Decision, StepResult, and trace types.
// Dependencies: crate::{identifiers, time, hashing, model, codes}
// ============================================================================

//! ## Overview
//! FailCore core provides the canonical, serializable data model for the
//! tool-call security runtime: steps, run contexts, policy documents,
//! validator decisions, step results, side-effect types, taint tags, and
//! the deterministic fingerprinting used by replay and drift analysis.
//! Every other FailCore crate depends on this one and none of its types
//! depend back out.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codes;
pub mod fingerprint;
pub mod identifiers;
pub mod model;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use fingerprint::Fingerprint;
pub use fingerprint::FingerprintError;
pub use fingerprint::fingerprint_params;
pub use identifiers::RunId;
pub use identifiers::SessionId;
pub use identifiers::StepId;
pub use identifiers::TraceId;
pub use model::Context;
pub use model::DataSensitivity;
pub use model::Decision;
pub use model::DecisionOutcome;
pub use model::EnforcementMode;
pub use model::EventBody;
pub use model::EventType;
pub use model::Exception;
pub use model::ExceptionScope;
pub use model::GlobalOverride;
pub use model::LogLevel;
pub use model::OutputContract;
pub use model::Policy;
pub use model::Remediation;
pub use model::RiskLevel;
pub use model::RunIdentity;
pub use model::SideEffectType;
pub use model::Step;
pub use model::StepError;
pub use model::StepOutput;
pub use model::StepOutputKind;
pub use model::StepResult;
pub use model::StepStatus;
pub use model::TRACE_SCHEMA_VERSION;
pub use model::TaintTag;
pub use model::TraceEvent;
pub use model::ValidatorConfig;
pub use model::truncate_with_suffix;
pub use time::Timestamp;

/// Reserved metadata namespace used for system-owned context keys.
///
/// # Invariants
/// - Callers must not write arbitrary data under this prefix; only the
///   pipeline and its collaborators populate these keys.
pub const SYSTEM_METADATA_PREFIX: &str = "failcore.sys.";

/// Well-known system metadata key names, always prefixed with
/// [`SYSTEM_METADATA_PREFIX`].
pub mod meta_keys {
    /// Timestamp at which the step began processing.
    pub const TIMESTAMP: &str = "failcore.sys.timestamp";
    /// Trace identifier for the owning run.
    pub const TRACE_ID: &str = "failcore.sys.trace_id";
    /// Run identifier for the owning run context.
    pub const RUN_ID: &str = "failcore.sys.run_id";
    /// Sandbox root directory for filesystem validators.
    pub const SANDBOX_ROOT: &str = "failcore.sys.sandbox_root";
    /// Break-glass override token, if presented for this step.
    pub const OVERRIDE_TOKEN: &str = "failcore.sys.override_token";
}
