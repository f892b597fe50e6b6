// fc-replay/src/error.rs
// ============================================================================
// Module: FailCore Replay Errors
// Description: Failure modes for building a replay index from a trace file.
// Purpose: Give callers a typed error distinct from the underlying trace read.
// Dependencies: fc-trace, thiserror
// ============================================================================

//! ## Overview
//! Replay index construction can only fail at the I/O boundary (reading the
//! historical trace file); a malformed or unrecognized individual line is
//! already tolerated by [`fc_trace::read_events`] and simply contributes no
//! history for that line.

use thiserror::Error;

/// Errors raised while building a [`crate::index::ReplayIndex`].
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The historical trace file could not be read.
    #[error("failed to read historical trace: {0}")]
    Trace(#[from] fc_trace::TraceError),
}
