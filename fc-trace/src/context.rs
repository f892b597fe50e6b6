// fc-trace/src/context.rs
// ============================================================================
// Module: Trace Context
// Description: Run-level invariants plus the monotonic sequence generator.
// Purpose: Give every emitted event the same run identity and an
//          ever-increasing `seq` without per-event bookkeeping at call sites.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! A [`TraceContext`] is created once per run and handed to the
//! [`crate::writer::TraceWriter`]; every emitted event is stamped with the
//! same [`fc_core::RunIdentity`] and the next value from a shared atomic
//! counter. The writer is the only component that generates
//! `seq`, and it serializes allocation so concurrent emitters still
//! produce a strictly increasing sequence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use fc_core::RunId;
use fc_core::RunIdentity;
use fc_core::Timestamp;
use fc_core::TraceId;

// ============================================================================
// SECTION: TraceContext
// ============================================================================

/// Run-level identity and sequence generator shared by every event a run
/// emits.
#[derive(Debug)]
pub struct TraceContext {
    identity: RunIdentity,
    next_seq: AtomicU64,
}

impl TraceContext {
    /// Builds a new trace context. The first call to [`Self::next_seq`]
    /// returns `1`, matching the on-disk schema's `seq >= 1` invariant.
    #[must_use]
    pub fn new(run_id: RunId, trace_id: TraceId, created_at: Timestamp, sandbox_root: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            identity: RunIdentity { run_id, trace_id, created_at, sandbox_root: sandbox_root.into(), tags },
            next_seq: AtomicU64::new(1),
        }
    }

    /// Returns this run's identity block, cloned for embedding in an event.
    #[must_use]
    pub fn identity(&self) -> RunIdentity {
        self.identity.clone()
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.identity.run_id
    }

    /// Atomically allocates and returns the next sequence number.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Returns the sequence number that will be allocated next, without
    /// consuming it. Used by tests and diagnostics only.
    #[must_use]
    pub fn peek_next_seq(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn context() -> TraceContext {
        TraceContext::new(RunId::new("r1"), TraceId::new("t1"), Timestamp::now(), "/tmp/run", Vec::new())
    }

    #[test]
    fn sequence_starts_at_one_and_increments() {
        let ctx = context();
        assert_eq!(ctx.next_seq(), 1);
        assert_eq!(ctx.next_seq(), 2);
        assert_eq!(ctx.peek_next_seq(), 3);
    }

    #[test]
    fn concurrent_callers_never_observe_a_duplicate_seq() {
        let ctx = Arc::new(context());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || (0..50).map(|_| ctx.next_seq()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = handles.into_iter().flat_map(|handle| handle.join().unwrap()).collect();
        all.sort_unstable();
        let mut deduped = all.clone();
        deduped.dedup();
        assert_eq!(all.len(), deduped.len(), "sequence allocation must never duplicate under concurrency");
    }
}
