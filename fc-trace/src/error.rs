// fc-trace/src/error.rs
// ============================================================================
// Module: FailCore Trace Errors
// Description: Failure modes for trace writing and reading.
// Purpose: Give callers a typed error while keeping the writer itself fail-open.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`TraceError`] is returned by the few trace operations that are allowed
//! to fail loudly (opening the file, explicit flush). Per-event writes
//! never return this type to their caller — see
//! [`crate::writer::TraceWriter::emit`], which swallows I/O failures after
//! logging, matching the runtime's fail-open posture for observability.

use thiserror::Error;

/// Errors raised while opening, writing, or reading a trace file.
#[derive(Debug, Error)]
pub enum TraceError {
    /// I/O failure opening, writing, or flushing the trace file.
    #[error("trace io error: {0}")]
    Io(String),
    /// A trace event failed to serialize to JSON.
    #[error("trace serialization error: {0}")]
    Serialize(String),
}
