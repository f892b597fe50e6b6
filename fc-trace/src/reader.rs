// fc-trace/src/reader.rs
// ============================================================================
// Module: Trace Reader
// Description: Tolerant line-by-line parsing of an append-only trace file.
// Purpose: Let the replay/drift engine and diagnostics consume a trace
//          file without choking on unknown fields or a trailing partial line.
// Dependencies: fc-core, serde_json
// ============================================================================

//! ## Overview
//! Readers tolerate unknown fields and unknown types, and a missing
//! `STEP_END` is acceptable and must not be treated as corruption (e.g.
//! after a cancelled run). [`read_events`] reflects both: a line that
//! fails to parse as a [`fc_core::TraceEvent`] at all is
//! skipped (with a count returned alongside, not panicked on), while a
//! line with fields this crate's schema version doesn't know about still
//! parses because `serde` ignores unrecognized object keys by default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use fc_core::TraceEvent;

use crate::error::TraceError;

// ============================================================================
// SECTION: Reading
// ============================================================================

/// Result of reading a trace file: the events that parsed, in file order,
/// and the count of lines that did not.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadOutcome {
    /// Successfully parsed events, in on-disk order.
    pub events: Vec<TraceEvent>,
    /// Number of non-blank lines that failed to parse as a [`TraceEvent`].
    pub unparsed_lines: usize,
}

/// Reads and parses every line of the JSONL trace file at `path`.
///
/// Blank lines are skipped silently (they occur if a writer was
/// interrupted mid-flush). A line that parses as JSON but not as a
/// [`TraceEvent`], or that isn't valid JSON at all, is counted in
/// [`ReadOutcome::unparsed_lines`] rather than aborting the read — a
/// single corrupted line must not make the rest of a forensic trace
/// unreadable.
///
/// # Errors
///
/// Returns [`TraceError::Io`] only when the file itself cannot be read
/// (missing, permission denied); per-line parse failures are reported in
/// the returned [`ReadOutcome`], not as an error.
pub fn read_events(path: &Path) -> Result<ReadOutcome, TraceError> {
    let content = fs::read_to_string(path).map_err(|err| TraceError::Io(err.to_string()))?;
    let mut outcome = ReadOutcome::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<TraceEvent>(trimmed) {
            Ok(event) => outcome.events.push(event),
            Err(_) => outcome.unparsed_lines += 1,
        }
    }
    Ok(outcome)
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
    use fc_core::EventBody;
    use fc_core::EventType;
    use fc_core::LogLevel;
    use fc_core::RunId;
    use fc_core::Timestamp;
    use fc_core::TraceId;
    use tempfile::TempDir;

    use super::*;
    use crate::context::TraceContext;
    use crate::writer::TraceWriter;

    #[test]
    fn reads_back_every_written_event() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.jsonl");
        let context = TraceContext::new(RunId::new("r1"), TraceId::new("t1"), Timestamp::now(), "/tmp/run", Vec::new());
        let writer = TraceWriter::open(&path, context).unwrap();
        writer.emit(LogLevel::Info, EventBody::new(EventType::RunStart));
        writer.emit(LogLevel::Info, EventBody::new(EventType::RunEnd));
        writer.flush().unwrap();

        let outcome = read_events(&path).unwrap();
        assert_eq!(outcome.events.len(), 2);
        assert_eq!(outcome.unparsed_lines, 0);
    }

    #[test]
    fn tolerates_unknown_fields_and_garbage_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trace.jsonl");
        let valid = serde_json::json!({
            "schema": "failcore.trace.v9.9.9",
            "seq": 1,
            "ts": Timestamp::now().to_rfc3339().unwrap(),
            "level": "INFO",
            "run": {"run_id": "r1", "trace_id": "t1", "created_at": Timestamp::now().to_rfc3339().unwrap(), "sandbox_root": "/tmp", "tags": []},
            "event": {"type": "RUN_START", "data": null},
            "future_field_a_future_reader_must_ignore": {"nested": true},
        });
        std::fs::write(&path, format!("{valid}\nnot json at all\n\n")).unwrap();

        let outcome = read_events(&path).unwrap();
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.unparsed_lines, 1);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = read_events(Path::new("/nonexistent/trace.jsonl"));
        assert!(result.is_err());
    }
}
