// fc-trace/src/lib.rs
// ============================================================================
// Module: FailCore Trace Library
// Description: Append-only JSONL trace writer, reader, and run context.
// Purpose: Expose TraceWriter, TraceContext, and read_events to every
//          component that records or consumes the forensic trace.
// Dependencies: crate::{context, error, reader, writer}
// ============================================================================

//! ## Overview
//! `fc-trace` owns the on-disk trace file: [`context::TraceContext`] gives
//! every event in a run the same identity and a monotonic `seq`,
//! [`writer::TraceWriter`] appends events fail-open, and [`reader::read_events`]
//! reads them back tolerantly for replay, drift, and diagnostics.

pub mod context;
pub mod error;
pub mod reader;
pub mod writer;

pub use context::TraceContext;
pub use error::TraceError;
pub use reader::ReadOutcome;
pub use reader::read_events;
pub use writer::TraceWriter;
