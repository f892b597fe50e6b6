// fc-replay/src/replay.rs
// ============================================================================
// Module: Replayer
// Description: Fingerprint-based lookup against a historical run, with
//              report/mock/resume enforcement modes.
// Purpose: Back the pipeline's replay hook (stage 5): decide whether a step
//          was seen before and what the pipeline should do about it.
// Dependencies: fc-core, crate::index
// ============================================================================

//! ## Overview
//! A [`Replayer`] wraps a [`crate::index::ReplayIndex`] built from a prior
//! run's trace file. On every call the pipeline computes the current step's
//! fingerprint and asks the replayer for a [`ReplayQueryResult`]. What the
//! pipeline does with a hit depends on [`ReplayMode`]:
//!
//! - `Report`: a hit is purely informational, the tool still does not run,
//!   and the step result is terminal-skipped.
//! - `Mock`: a hit returns the historical output verbatim as if the tool had
//!   run (a `REPLAY_INJECTED` event), again without dispatching the tool.
//! - `Resume`: the tool runs normally; the historical record is used only to
//!   detect drift in the freshly produced output (`REPLAY_OUTPUT_DIFF`) and
//!   in the policy decisions the current call produced relative to the
//!   historical ones (`REPLAY_POLICY_DIFF`).
//!
//! A miss always produces a `REPLAY_STEP_MISS` event; in `Report` and `Mock`
//! mode it is also terminal (the tool does not run, result code `REPLAY_MISS`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use fc_core::Fingerprint;
use fc_core::StepOutput;

use crate::index::HistoricalStep;
use crate::index::ReplayIndex;

// ============================================================================
// SECTION: Mode
// ============================================================================

/// Replay enforcement mode, set per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Hits are recorded but never substituted; the pipeline still dispatches.
    Report,
    /// Hits substitute the historical output; the pipeline never dispatches.
    Mock,
    /// The pipeline always dispatches; history is used only for diffing.
    Resume,
}

impl ReplayMode {
    /// `true` when this mode substitutes or skips dispatch on a hit or miss
    /// (i.e. every mode except [`ReplayMode::Resume`]).
    #[must_use]
    pub fn short_circuits_dispatch(self) -> bool {
        !matches!(self, ReplayMode::Resume)
    }
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Detail recorded for a fingerprint hit.
#[derive(Debug, Clone)]
pub struct HitDetail {
    /// The matched historical step.
    pub historical: HistoricalStep,
    /// `true` when the current call's decision codes differ from the
    /// historical call's decision codes.
    pub policy_diff: bool,
    /// Decision codes present in exactly one of the two runs.
    pub diff_codes: Vec<String>,
}

/// Outcome of a replay lookup.
#[derive(Debug, Clone)]
pub enum ReplayOutcome {
    /// The fingerprint was found in history.
    Hit(HitDetail),
    /// The fingerprint has no historical record.
    Miss,
}

/// Result of querying the replayer for one step.
#[derive(Debug, Clone)]
pub struct ReplayQueryResult {
    /// The canonical fingerprint that was looked up.
    pub fingerprint: Fingerprint,
    /// The lookup outcome.
    pub outcome: ReplayOutcome,
}

// ============================================================================
// SECTION: Replayer
// ============================================================================

/// Answers "was this call seen before?" against a historical trace.
#[derive(Debug, Clone)]
pub struct Replayer {
    index: ReplayIndex,
    mode: ReplayMode,
}

impl Replayer {
    /// Builds a replayer over `index` operating in `mode`.
    #[must_use]
    pub fn new(index: ReplayIndex, mode: ReplayMode) -> Self {
        Self { index, mode }
    }

    /// The replay mode this replayer was constructed with.
    #[must_use]
    pub fn mode(&self) -> ReplayMode {
        self.mode
    }

    /// Looks up `fingerprint` and compares `current_decision_codes` against
    /// the historical decisions on a hit.
    #[must_use]
    pub fn query(&self, fingerprint: &Fingerprint, current_decision_codes: &[String]) -> ReplayQueryResult {
        let outcome = match self.index.get(&fingerprint.as_canonical()) {
            Some(historical) => {
                let diff_codes = symmetric_difference(&historical.decision_codes, current_decision_codes);
                let policy_diff = !diff_codes.is_empty();
                ReplayOutcome::Hit(HitDetail { historical: historical.clone(), policy_diff, diff_codes })
            }
            None => ReplayOutcome::Miss,
        };
        ReplayQueryResult { fingerprint: fingerprint.clone(), outcome }
    }
}

/// Decision codes present in exactly one of the two lists, historical first.
fn symmetric_difference(historical: &[String], current: &[String]) -> Vec<String> {
    let mut diff: Vec<String> = historical.iter().filter(|code| !current.contains(code)).cloned().collect();
    diff.extend(current.iter().filter(|code| !historical.contains(code)).cloned());
    diff
}

/// `true` when a resume-mode dispatch produced output that differs from the
/// historical record — drives `REPLAY_OUTPUT_DIFF`.
#[must_use]
pub fn outputs_differ(historical: Option<&StepOutput>, current: Option<&StepOutput>) -> bool {
    match (historical, current) {
        (Some(a), Some(b)) => a != b,
        (None, None) => false,
        _ => true,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use fc_core::fingerprint_params;
    use serde_json::Map;

    use super::*;
    use crate::index::HistoricalStep;

    fn sample_index() -> ReplayIndex {
        let mut events = Vec::new();
        let step = serde_json::json!({"id": "s1", "tool": "read_file", "attempt": 0});
        events.push(fc_core::TraceEvent::new(
            1,
            fc_core::Timestamp::now(),
            fc_core::LogLevel::Info,
            fc_core::RunIdentity {
                run_id: fc_core::RunId::new("r"),
                trace_id: fc_core::TraceId::new("t"),
                created_at: fc_core::Timestamp::now(),
                sandbox_root: "/tmp".to_string(),
                tags: Vec::new(),
            },
            fc_core::EventBody::new(fc_core::EventType::StepStart).with_step(step.clone()).with_data(serde_json::json!({"params": {"path": "/x"}})),
        ));
        events.push(fc_core::TraceEvent::new(
            2,
            fc_core::Timestamp::now(),
            fc_core::LogLevel::Info,
            fc_core::RunIdentity {
                run_id: fc_core::RunId::new("r"),
                trace_id: fc_core::TraceId::new("t"),
                created_at: fc_core::Timestamp::now(),
                sandbox_root: "/tmp".to_string(),
                tags: Vec::new(),
            },
            fc_core::EventBody::new(fc_core::EventType::Result).with_step(step).with_data(serde_json::json!({"status": "ok", "decisions": ["FC_SEC_PATH_TRAVERSAL"]})),
        ));
        ReplayIndex::from_events(&events)
    }

    fn fingerprint_for(path: &str) -> Fingerprint {
        let mut map = Map::new();
        map.insert("path".to_string(), serde_json::Value::String(path.to_string()));
        fingerprint_params("read_file", &map).unwrap()
    }

    #[test]
    fn hit_with_matching_decisions_has_no_policy_diff() {
        let replayer = Replayer::new(sample_index(), ReplayMode::Report);
        let result = replayer.query(&fingerprint_for("/x"), &["FC_SEC_PATH_TRAVERSAL".to_string()]);
        match result.outcome {
            ReplayOutcome::Hit(detail) => assert!(!detail.policy_diff),
            ReplayOutcome::Miss => panic!("expected hit"),
        }
    }

    #[test]
    fn hit_with_different_decisions_reports_policy_diff() {
        let replayer = Replayer::new(sample_index(), ReplayMode::Report);
        let result = replayer.query(&fingerprint_for("/x"), &[]);
        match result.outcome {
            ReplayOutcome::Hit(detail) => {
                assert!(detail.policy_diff);
                assert_eq!(detail.diff_codes, vec!["FC_SEC_PATH_TRAVERSAL".to_string()]);
            }
            ReplayOutcome::Miss => panic!("expected hit"),
        }
    }

    #[test]
    fn unseen_fingerprint_is_a_miss() {
        let replayer = Replayer::new(sample_index(), ReplayMode::Report);
        let result = replayer.query(&fingerprint_for("/y"), &[]);
        assert!(matches!(result.outcome, ReplayOutcome::Miss));
    }

    #[test]
    fn only_resume_mode_runs_the_tool() {
        assert!(!ReplayMode::Resume.short_circuits_dispatch());
        assert!(ReplayMode::Report.short_circuits_dispatch());
        assert!(ReplayMode::Mock.short_circuits_dispatch());
    }

    #[test]
    fn output_diff_detects_mismatch() {
        let a = StepOutput::text("hello".to_string());
        let b = StepOutput::text("world".to_string());
        assert!(outputs_differ(Some(&a), Some(&b)));
        assert!(!outputs_differ(Some(&a), Some(&a.clone())));
        assert!(outputs_differ(None, Some(&a)));
        assert!(!outputs_differ(None, None));
    }

    #[test]
    fn historical_step_field_is_accessible() {
        let step = HistoricalStep { tool: "t".to_string(), status: "ok".to_string(), decision_codes: Vec::new(), output: None, seq: 1 };
        assert_eq!(step.tool, "t");
    }
}
