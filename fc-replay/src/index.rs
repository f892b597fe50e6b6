// fc-replay/src/index.rs
// ============================================================================
// Module: Replay Index
// Description: Fingerprint-indexed history built from a historical trace file.
// Purpose: Let the replay engine answer "was this exact call seen before?"
//          without re-scanning the trace file per step.
// Dependencies: fc-core, fc-trace
// ============================================================================

//! ## Overview
//! The pipeline stamps every step's trace with a `STEP_START` event whose
//! `event.step` carries `{id, tool, attempt}` and whose `event.data` carries
//! `{"params": ...}`, and a terminal `RESULT` event whose `event.data`
//! carries `{"status", "code"?, "output"?, "decisions": [...]}`. [`ReplayIndex::build`]
//! pairs these by `(step_id, attempt)`, computes each step's canonical
//! [`fc_core::Fingerprint`], and keeps the most recent occurrence of each
//! fingerprint — a historical trace that called the same tool with the same
//! parameters more than once is indexed by its latest recorded outcome.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use fc_core::StepOutput;
use fc_core::TraceEvent;
use fc_core::fingerprint_params;

use crate::error::ReplayError;

// ============================================================================
// SECTION: Historical Step
// ============================================================================

/// One historical step's recorded identity and terminal outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalStep {
    /// Tool name.
    pub tool: String,
    /// Terminal status string as recorded (`ok`, `fail`, `blocked`, `skipped`, `replayed`).
    pub status: String,
    /// Decision codes recorded for this step, in evaluation order.
    pub decision_codes: Vec<String>,
    /// Observed output, if the step produced one.
    pub output: Option<StepOutput>,
    /// Sequence number of the `RESULT` event this was extracted from.
    pub seq: u64,
}

// ============================================================================
// SECTION: Index
// ============================================================================

/// Fingerprint-keyed history of previously recorded steps.
#[derive(Debug, Clone, Default)]
pub struct ReplayIndex {
    entries: BTreeMap<String, HistoricalStep>,
}

impl ReplayIndex {
    /// Builds an index by reading and pairing every `STEP_START`/`RESULT`
    /// event in the trace file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError`] when the trace file itself cannot be read.
    pub fn build(path: &Path) -> Result<Self, ReplayError> {
        let outcome = fc_trace::read_events(path)?;
        Ok(Self::from_events(&outcome.events))
    }

    /// Builds an index directly from an in-memory event slice (tests, and
    /// callers that already hold a parsed trace).
    #[must_use]
    pub fn from_events(events: &[TraceEvent]) -> Self {
        let mut starts: BTreeMap<(String, u32), (String, serde_json::Map<String, serde_json::Value>)> = BTreeMap::new();
        let mut entries = BTreeMap::new();

        for event in events {
            let Some(step) = &event.event.step else { continue };
            let Some(step_id) = step.get("id").and_then(serde_json::Value::as_str) else { continue };
            let attempt = step.get("attempt").and_then(serde_json::Value::as_u64).unwrap_or(0) as u32;
            let key = (step_id.to_string(), attempt);

            match event.event.event_type {
                fc_core::EventType::StepStart => {
                    let Some(tool) = step.get("tool").and_then(serde_json::Value::as_str) else { continue };
                    let params = event.event.data.get("params").and_then(serde_json::Value::as_object).cloned().unwrap_or_default();
                    starts.insert(key, (tool.to_string(), params));
                }
                fc_core::EventType::Result => {
                    let Some((tool, params)) = starts.get(&key) else { continue };
                    let Ok(fingerprint) = fingerprint_params(tool, params) else { continue };
                    let status = event.event.data.get("status").and_then(serde_json::Value::as_str).unwrap_or("unknown").to_string();
                    let decision_codes = event
                        .event
                        .data
                        .get("decisions")
                        .and_then(serde_json::Value::as_array)
                        .map(|values| values.iter().filter_map(|value| value.as_str().map(str::to_string)).collect())
                        .unwrap_or_default();
                    let output = event
                        .event
                        .data
                        .get("output")
                        .filter(|value| !value.is_null())
                        .and_then(|value| serde_json::from_value::<StepOutput>(value.clone()).ok());
                    entries.insert(
                        fingerprint.as_canonical(),
                        HistoricalStep { tool: tool.clone(), status, decision_codes, output, seq: event.seq },
                    );
                }
                _ => {}
            }
        }

        Self { entries }
    }

    /// Looks up a historical step by its canonical fingerprint string
    /// (`tool#digest`).
    #[must_use]
    pub fn get(&self, canonical_fingerprint: &str) -> Option<&HistoricalStep> {
        self.entries.get(canonical_fingerprint)
    }

    /// Returns the number of distinct fingerprints indexed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
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
    use fc_core::EventBody;
    use fc_core::EventType;
    use fc_core::LogLevel;
    use fc_core::RunId;
    use fc_core::RunIdentity;
    use fc_core::Timestamp;
    use fc_core::TraceId;
    use fc_core::TraceEvent;
    use serde_json::json;

    use super::*;

    fn run() -> RunIdentity {
        RunIdentity { run_id: RunId::new("r1"), trace_id: TraceId::new("t1"), created_at: Timestamp::now(), sandbox_root: "/tmp".to_string(), tags: Vec::new() }
    }

    fn event(seq: u64, event_type: EventType, step: serde_json::Value, data: serde_json::Value) -> TraceEvent {
        TraceEvent::new(seq, Timestamp::now(), LogLevel::Info, run(), EventBody::new(event_type).with_step(step).with_data(data))
    }

    #[test]
    fn pairs_step_start_and_result_into_one_historical_entry() {
        let events = vec![
            event(1, EventType::StepStart, json!({"id": "s1", "tool": "read_file", "attempt": 0}), json!({"params": {"path": "/x"}})),
            event(2, EventType::Result, json!({"id": "s1", "tool": "read_file", "attempt": 0}), json!({"status": "ok", "decisions": [], "output": {"kind": "text", "value": "hello"}})),
        ];
        let index = ReplayIndex::from_events(&events);
        assert_eq!(index.len(), 1);

        let fingerprint = fingerprint_params("read_file", &{
            let serde_json::Value::Object(map) = json!({"path": "/x"}) else { unreachable!() };
            map
        })
        .unwrap();
        let found = index.get(&fingerprint.as_canonical()).unwrap();
        assert_eq!(found.status, "ok");
        assert!(found.output.is_some());
    }

    #[test]
    fn result_without_matching_start_is_ignored() {
        let events = vec![event(1, EventType::Result, json!({"id": "orphan", "tool": "x", "attempt": 0}), json!({"status": "ok"}))];
        let index = ReplayIndex::from_events(&events);
        assert!(index.is_empty());
    }

    #[test]
    fn later_occurrence_of_same_fingerprint_overwrites_earlier() {
        let events = vec![
            event(1, EventType::StepStart, json!({"id": "s1", "tool": "read_file", "attempt": 0}), json!({"params": {"path": "/x"}})),
            event(2, EventType::Result, json!({"id": "s1", "tool": "read_file", "attempt": 0}), json!({"status": "ok"})),
            event(3, EventType::StepStart, json!({"id": "s2", "tool": "read_file", "attempt": 0}), json!({"params": {"path": "/x"}})),
            event(4, EventType::Result, json!({"id": "s2", "tool": "read_file", "attempt": 0}), json!({"status": "fail"})),
        ];
        let index = ReplayIndex::from_events(&events);
        assert_eq!(index.len(), 1);
        let fingerprint = fingerprint_params("read_file", &{
            let serde_json::Value::Object(map) = json!({"path": "/x"}) else { unreachable!() };
            map
        })
        .unwrap();
        assert_eq!(index.get(&fingerprint.as_canonical()).unwrap().status, "fail");
    }
}
