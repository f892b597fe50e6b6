// fc-policy/src/error.rs
// ============================================================================
// Module: FailCore Policy Errors
// Description: Failure modes for policy loading, parsing, and merging.
// Purpose: Give callers a fail-closed, typed error for every policy operation.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Policy inputs are untrusted data files. Every failure mode here is
//! fail-closed: a caller that cannot load a policy must not fall back to an
//! implicit allow-all posture.

use thiserror::Error;

// ============================================================================
// SECTION: PolicyError
// ============================================================================

/// Errors raised while loading, parsing, or merging a [`fc_core::Policy`].
#[derive(Debug, Error)]
pub enum PolicyError {
    /// I/O failure while reading a policy file.
    #[error("policy io error: {0}")]
    Io(String),
    /// YAML parsing error.
    #[error("policy yaml error: {0}")]
    Yaml(String),
    /// JSON parsing error.
    #[error("policy json error: {0}")]
    Json(String),
    /// Policy data failed structural or semantic validation.
    #[error("invalid policy: {0}")]
    Invalid(String),
}
