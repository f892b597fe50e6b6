// fc-trace/src/writer.rs
// ============================================================================
// Module: Trace Writer
// Description: Append-only, thread-safe JSONL recorder for trace events.
// Purpose: Turn `EventBody`s into durable, sequenced lines on disk.
// Dependencies: fc-core, crate::context, serde_json, tracing
// ============================================================================

//! ## Overview
//! The [`TraceWriter`] owns the trace file for one run. `emit` stamps an
//! [`fc_core::EventBody`] with the next sequence number, the current
//! level, and the run's identity, serializes it to one JSON line, and
//! appends it under a lock so concurrent emitters never interleave
//! partial lines. The writer never throws: a
//! write failure is logged and dropped rather than propagated, because
//! tracing is fail-open while the step pipeline itself is not. Buffered
//! writes are permitted; [`TraceWriter::flush`] is mandatory on close and
//! is also called periodically by callers that want bounded durability
//! windows.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use fc_core::EventBody;
use fc_core::LogLevel;
use fc_core::Timestamp;
use fc_core::TraceEvent;

use crate::context::TraceContext;
use crate::error::TraceError;

// ============================================================================
// SECTION: Writer
// ============================================================================

/// Append-only JSONL recorder for one run's trace file.
pub struct TraceWriter {
    context: TraceContext,
    path: PathBuf,
    sink: Mutex<BufWriter<File>>,
}

impl TraceWriter {
    /// Opens (creating parent directories and the file if needed) a trace
    /// file at `path` for append, bound to `context`.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Io`] when the parent directory cannot be
    /// created or the file cannot be opened for append.
    pub fn open(path: impl Into<PathBuf>, context: TraceContext) -> Result<Self, TraceError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| TraceError::Io(err.to_string()))?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).map_err(|err| TraceError::Io(err.to_string()))?;
        Ok(Self { context, path, sink: Mutex::new(BufWriter::new(file)) })
    }

    /// Returns the path this writer appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the trace context this writer stamps events with.
    #[must_use]
    pub fn context(&self) -> &TraceContext {
        &self.context
    }

    /// Stamps `event` with the next sequence number and `level`, appends
    /// it as one JSON line, and returns the fully-formed [`TraceEvent`]
    /// for callers that want to inspect what was (attempted to be)
    /// written.
    ///
    /// Never returns an error: a serialization or I/O failure is logged
    /// via `tracing::warn!` and the line is dropped. The sequence number
    /// is still consumed so gaps, not duplicates, are the visible failure
    /// mode — a reader encountering a gap can tell tracing dropped an
    /// event instead of silently missing one with no indication at all.
    pub fn emit(&self, level: LogLevel, event: EventBody) -> TraceEvent {
        let seq = self.context.next_seq();
        let trace_event = TraceEvent::new(seq, Timestamp::now(), level, self.context.identity(), event);
        self.write_line(&trace_event);
        trace_event
    }

    fn write_line(&self, event: &TraceEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(error) => {
                tracing::warn!(seq = event.seq, error = %error, "failed to serialize trace event; dropping");
                return;
            }
        };
        let Ok(mut sink) = self.sink.lock() else {
            tracing::warn!(seq = event.seq, "trace writer mutex poisoned; dropping event");
            return;
        };
        if let Err(error) = writeln!(sink, "{line}") {
            tracing::warn!(seq = event.seq, error = %error, "failed to append trace event; dropping");
        }
    }

    /// Flushes buffered writes to disk.
    ///
    /// # Errors
    ///
    /// Returns [`TraceError::Io`] when the underlying flush fails. Callers
    /// on a run-context close path should still consider the run closed
    /// even if this returns an error (fail-open
    /// observability posture), but may want to surface the error to an
    /// operator.
    pub fn flush(&self) -> Result<(), TraceError> {
        let mut sink = self.sink.lock().map_err(|_| TraceError::Io("trace writer mutex poisoned".to_string()))?;
        sink.flush().map_err(|err| TraceError::Io(err.to_string()))
    }
}

impl Drop for TraceWriter {
    fn drop(&mut self) {
        if let Err(error) = self.flush() {
            tracing::warn!(error = %error, "failed to flush trace writer on drop");
        }
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
    use fc_core::EventType;
    use fc_core::RunId;
    use fc_core::TraceId;
    use tempfile::TempDir;

    use super::*;

    fn writer(dir: &TempDir) -> TraceWriter {
        let context = TraceContext::new(RunId::new("r1"), TraceId::new("t1"), Timestamp::now(), "/tmp/run", Vec::new());
        TraceWriter::open(dir.path().join("trace.jsonl"), context).unwrap()
    }

    #[test]
    fn emitted_events_have_increasing_seq() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let a = writer.emit(LogLevel::Info, EventBody::new(EventType::RunStart));
        let b = writer.emit(LogLevel::Info, EventBody::new(EventType::StepStart));
        assert!(b.seq > a.seq);
    }

    #[test]
    fn flush_then_read_back_yields_valid_jsonl() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        writer.emit(LogLevel::Info, EventBody::new(EventType::RunStart));
        writer.emit(LogLevel::Info, EventBody::new(EventType::RunEnd));
        writer.flush().unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("seq").is_some());
        }
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("trace.jsonl");
        let context = TraceContext::new(RunId::new("r1"), TraceId::new("t1"), Timestamp::now(), "/tmp/run", Vec::new());
        let writer = TraceWriter::open(nested, context).unwrap();
        writer.emit(LogLevel::Info, EventBody::new(EventType::RunStart));
        writer.flush().unwrap();
        assert!(writer.path().exists());
    }
}
