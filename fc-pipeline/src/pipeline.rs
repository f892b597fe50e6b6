// fc-pipeline/src/pipeline.rs
// ============================================================================
// Module: Execution Pipeline
// Description: The seven-stage synchronous step execution engine.
// Purpose: Turn one submitted `Step` into a terminal `StepResult`, emitting
//          exactly the trace events a forensic reconstruction needs along the way.
// Dependencies: fc-core, fc-validate, fc-semantic, fc-taint, fc-trace,
//               fc-replay, crate::{run, registry, side_effect}
// ============================================================================

//! ## Overview
//! [`Run::run_step`] is the only entry point. It always emits exactly one
//! `STEP_START` before stage 1 and exactly one `STEP_END` after whichever
//! stage terminates the step under one cross-cutting contract; every
//! other event is stage-specific and conditional. No stage here ever
//! panics or propagates a `Result` out to the caller — a tool raising, a
//! validator blocking, a semantic violation, all become a non-`Ok`
//! [`fc_core::StepResult`], never an error unwound past this function.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use fc_core::Context;
use fc_core::Decision;
use fc_core::DecisionOutcome;
use fc_core::EventBody;
use fc_core::EventType;
use fc_core::LogLevel;
use fc_core::Step;
use fc_core::StepError;
use fc_core::StepId;
use fc_core::StepOutput;
use fc_core::StepResult;
use fc_core::StepStatus;
use fc_core::Timestamp;
use fc_core::codes;
use fc_core::fingerprint_params;
use fc_replay::ReplayMode;
use fc_replay::ReplayOutcome;
use fc_replay::outputs_differ;
use fc_taint::STATE_KEY_TAINT_TAGS;
use fc_taint::SinkVerdict;
use fc_validate::EvaluateOptions;
use fc_validate::ValidationEngine;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::run::Run;
use crate::side_effect;

/// Maximum length a `StepError`'s message is truncated to before being
/// stored or traced.
const MAX_ERROR_MESSAGE_LEN: usize = 4096;

// ============================================================================
// SECTION: Terminal Outcome
// ============================================================================

/// Internal terminal description a stage produces; converted to a
/// [`StepResult`] once the run's bookkeeping (timestamps, attempt) is known.
struct Terminal {
    status: StepStatus,
    phase: &'static str,
    output: Option<StepOutput>,
    error: Option<StepError>,
}

impl Terminal {
    fn ok(phase: &'static str, output: StepOutput) -> Self {
        Self { status: StepStatus::Ok, phase, output: Some(output), error: None }
    }

    fn replayed(phase: &'static str, output: Option<StepOutput>) -> Self {
        Self { status: StepStatus::Replayed, phase, output, error: None }
    }

    fn fail(phase: &'static str, error: StepError) -> Self {
        Self { status: StepStatus::Fail, phase, output: None, error: Some(error) }
    }

    fn blocked(phase: &'static str, error: StepError) -> Self {
        Self { status: StepStatus::Blocked, phase, output: None, error: Some(error) }
    }

    fn skipped(phase: &'static str, error: StepError) -> Self {
        Self { status: StepStatus::Skipped, phase, output: None, error: Some(error) }
    }
}

// ============================================================================
// SECTION: Driver
// ============================================================================

impl Run {
    /// Runs `step` through every pipeline stage, returning its terminal
    /// result. Resubmitting the same step id increments its attempt
    /// counter; the dependency graph entry for `step.id` is recorded
    /// (append-only) regardless of outcome.
    pub fn run_step(&mut self, step: &Step) -> StepResult {
        let started_at = Timestamp::now();
        let attempt = self.next_attempt(&step.id);
        self.record_dependencies(&step.id, &step.depends_on);

        self.trace.emit(
            LogLevel::Info,
            EventBody::new(EventType::StepStart).with_step(step_scope(step, attempt)).with_data(json!({"params": Value::Object(step.params.clone())})),
        );

        let mut decision_codes: Vec<String> = Vec::new();
        let terminal = self.execute(step, attempt, &mut decision_codes);

        let finished_at = Timestamp::now();
        let result = finalize(step, attempt, started_at, finished_at, terminal);

        self.trace.emit(
            level_for_status(result.status),
            EventBody::new(EventType::Result).with_step(step_scope(step, attempt)).with_data(result_data(&result, &decision_codes)),
        );
        self.trace.emit(LogLevel::Info, EventBody::new(EventType::StepEnd).with_step(step_scope(step, attempt)));

        result
    }

    fn execute(&mut self, step: &Step, attempt: u32, decision_codes: &mut Vec<String>) -> Terminal {
        // Stage 1: Basic Validation.
        if !step.is_structurally_valid() {
            return Terminal::fail("validate", StepError::new(codes::PARAM_INVALID, "step id, tool, or a param key was empty", MAX_ERROR_MESSAGE_LEN));
        }

        // Stage 2: Precondition Validation.
        let propagated_tags = self.taint_engine.propagate(&self.taint_store, &step.depends_on);
        let mut context = self.build_context(step, None);
        context.state.insert(STATE_KEY_TAINT_TAGS.to_string(), json!(propagated_tags));

        let options = EvaluateOptions { now: Timestamp::now(), override_token_present: self.override_token_present, strict: false };
        let engine = ValidationEngine::new(&self.policy, &self.validators);
        let decisions = engine.evaluate_deduped(&context, options);
        self.emit_decisions(step, attempt, &decisions);
        decision_codes.extend(decisions.iter().map(|decision| decision.code.clone()));
        if let Some(blocking) = decisions.iter().find(|decision| decision.is_blocking()) {
            return Terminal::blocked("validate", error_from_decision(blocking));
        }

        // Stage 3: Side-Effect Boundary.
        let predicted_effect = side_effect::predict(&step.tool, &step.params);
        if let (Some(boundary), Some(effect)) = (&self.side_effect_boundary, predicted_effect) {
            if boundary.crosses(effect) {
                let target = side_effect_target(&step.params).unwrap_or_else(|| step.tool.clone());
                let error = StepError::new(codes::SIDE_EFFECT_BOUNDARY_CROSSED, format!("predicted side-effect '{effect:?}' crosses the configured boundary"), MAX_ERROR_MESSAGE_LEN)
                    .with_detail("predicted_type", json!(format!("{effect:?}")))
                    .with_detail("target", json!(target))
                    .with_detail("tool", json!(step.tool));
                return Terminal::blocked("policy", error);
            }
        }

        // Stage 4: Semantic Guard.
        if let Some(verdict) = self.semantic_guard.evaluate(&step.tool, &step.params) {
            decision_codes.push(codes::SEMANTIC_VIOLATION.to_string());
            if self.semantic_guard.block_on_violation() {
                let error = StepError::new(codes::SEMANTIC_VIOLATION, verdict.explanation.clone(), MAX_ERROR_MESSAGE_LEN)
                    .with_detail("rule_id", json!(verdict.rule_id))
                    .with_detail("evidence", json!(verdict.evidence));
                return Terminal::blocked("semantic", error);
            }
            self.trace.emit(
                LogLevel::Warn,
                EventBody::new(EventType::ValidationFailed)
                    .with_step(step_scope(step, attempt))
                    .with_data(json!({"code": codes::SEMANTIC_VIOLATION, "validator_id": "semantic_guard", "message": verdict.explanation})),
            );
        }

        // Stage 5: Replay Hook.
        let mut historical_output = None;
        if let Some(early_exit) = self.replay_hook(step, attempt, decision_codes, &mut historical_output) {
            return early_exit;
        }

        // Stage 6: Dispatch.
        let output = match self.dispatch(step, &propagated_tags) {
            Ok(output) => output,
            Err(terminal) => return terminal,
        };

        if let Some(historical) = &historical_output {
            if outputs_differ(historical.output.as_ref(), Some(&output)) {
                self.trace.emit(
                    LogLevel::Warn,
                    EventBody::new(EventType::ReplayOutputDiff).with_step(step_scope(step, attempt)).with_data(json!({"tool": step.tool})),
                );
            }
        }

        // Stage 7: Output Contract.
        self.output_contract(step, attempt, output, decision_codes)
    }

    fn replay_hook(&mut self, step: &Step, attempt: u32, decision_codes: &mut Vec<String>, historical_output: &mut Option<fc_replay::HistoricalStep>) -> Option<Terminal> {
        let replayer = self.replayer.as_ref()?;
        let Ok(fingerprint) = fingerprint_params(&step.tool, &step.params) else {
            tracing::warn!(tool = %step.tool, "failed to compute fingerprint for replay lookup; skipping replay hook");
            return None;
        };
        self.trace.emit(
            LogLevel::Debug,
            EventBody::new(EventType::FingerprintComputed).with_step(step_scope(step, attempt)).with_data(json!({"fingerprint": fingerprint.as_canonical()})),
        );

        let query = replayer.query(&fingerprint, decision_codes);
        match query.outcome {
            ReplayOutcome::Hit(detail) => {
                self.trace.emit(
                    LogLevel::Info,
                    EventBody::new(EventType::ReplayStepHit).with_step(step_scope(step, attempt)).with_data(json!({"fingerprint": fingerprint.as_canonical()})),
                );
                if detail.policy_diff {
                    self.trace.emit(
                        LogLevel::Warn,
                        EventBody::new(EventType::ReplayPolicyDiff)
                            .with_step(step_scope(step, attempt))
                            .with_data(json!({"fingerprint": fingerprint.as_canonical(), "diff_codes": detail.diff_codes})),
                    );
                }
                match replayer.mode() {
                    ReplayMode::Report => Some(Terminal::skipped("replay", StepError::new(codes::REPLAY_REPORT_MODE, "replay report mode: tool not executed", MAX_ERROR_MESSAGE_LEN))),
                    ReplayMode::Mock => {
                        self.trace.emit(
                            LogLevel::Info,
                            EventBody::new(EventType::ReplayInjected).with_step(step_scope(step, attempt)).with_data(json!({"fingerprint": fingerprint.as_canonical()})),
                        );
                        Some(Terminal::replayed("replay", detail.historical.output.clone()))
                    }
                    ReplayMode::Resume => {
                        *historical_output = Some(detail.historical);
                        None
                    }
                }
            }
            ReplayOutcome::Miss => {
                self.trace.emit(
                    LogLevel::Info,
                    EventBody::new(EventType::ReplayStepMiss).with_step(step_scope(step, attempt)).with_data(json!({"fingerprint": fingerprint.as_canonical()})),
                );
                if replayer.mode().short_circuits_dispatch() {
                    Some(Terminal::skipped("replay", StepError::new(codes::REPLAY_MISS, "no historical record for this fingerprint", MAX_ERROR_MESSAGE_LEN)))
                } else {
                    None
                }
            }
        }
    }

    fn dispatch(&mut self, step: &Step, propagated_tags: &[fc_core::TaintTag]) -> Result<StepOutput, Terminal> {
        let Some(tool) = self.tools.get(&step.tool).cloned() else {
            return Err(Terminal::fail("dispatch", StepError::new(codes::TOOL_NOT_FOUND, format!("no tool registered under '{}'", step.tool), MAX_ERROR_MESSAGE_LEN)));
        };

        let mut params = step.params.clone();
        if self.taint_engine.is_sink(&step.tool) {
            let text = sink_text(&params);
            match self.taint_engine.evaluate_sink(&step.tool, propagated_tags, text.as_deref()) {
                SinkVerdict::Clean => {}
                SinkVerdict::Blocked(decision) => return Err(Terminal::blocked("dispatch", error_from_decision(&decision))),
                SinkVerdict::RequiresApproval(decision) => {
                    let mut error = error_from_decision(&decision);
                    error = error.with_detail("requires_approval", json!(true));
                    return Err(Terminal::blocked("dispatch", error));
                }
                SinkVerdict::Sanitized { .. } => redact_string_params(&mut params),
            }
        }

        let context = self.build_context(step, None);
        let context = Context { params: params.clone(), ..context };

        let predicted_effect = side_effect::predict(&step.tool, &params);
        let result = self.process_executor.execute(tool.as_ref(), &context);

        if let Some(effect) = predicted_effect {
            let target = side_effect_target(&params).unwrap_or_else(|| step.tool.clone());
            self.trace.emit(
                LogLevel::Info,
                EventBody::new(EventType::SideEffectApplied).with_data(json!({"type": format!("{effect:?}"), "target": target, "tool": step.tool})),
            );
        }

        match result {
            Ok(output) => {
                self.taint_engine.on_call_success(&mut self.taint_store, step.id.clone(), &step.tool, Some(&output.summarize_text()), None);
                Ok(output)
            }
            Err(tool_error) => {
                let error = StepError::new(codes::TOOL_RAISED, tool_error.message, MAX_ERROR_MESSAGE_LEN).with_detail("tool_code", json!(tool_error.code));
                Err(Terminal::fail("dispatch", error))
            }
        }
    }

    fn output_contract(&mut self, step: &Step, attempt: u32, output: StepOutput, decision_codes: &mut Vec<String>) -> Terminal {
        let mut context = self.build_context(step, Some(output.clone()));
        context.expected_output = step.expected_output.clone();

        let options = EvaluateOptions { now: Timestamp::now(), override_token_present: self.override_token_present, strict: false };
        let engine = ValidationEngine::new(&self.policy, &self.validators);
        let decisions = engine.evaluate_deduped(&context, options);
        self.emit_decisions(step, attempt, &decisions);
        decision_codes.extend(decisions.iter().map(|decision| decision.code.clone()));

        if let Some(blocking) = decisions.iter().find(|decision| decision.is_blocking()) {
            return Terminal::blocked("contract", error_from_decision(blocking));
        }
        for decision in &decisions {
            self.trace.emit(
                LogLevel::Warn,
                EventBody::new(EventType::OutputNormalized).with_step(step_scope(step, attempt)).with_data(json!({"code": decision.code, "message": decision.message})),
            );
        }

        Terminal::ok("contract", output)
    }

    fn emit_decisions(&mut self, step: &Step, attempt: u32, decisions: &[Decision]) {
        for decision in decisions {
            let event_type = if decision.is_blocking() { EventType::PolicyDenied } else { EventType::ValidationFailed };
            let level = if decision.is_blocking() { LogLevel::Error } else { LogLevel::Warn };
            if decision.outcome == DecisionOutcome::Allow {
                continue;
            }
            self.trace.emit(
                level,
                EventBody::new(event_type)
                    .with_step(step_scope(step, attempt))
                    .with_data(json!({"code": decision.code, "validator_id": decision.validator_id, "message": decision.message})),
            );
        }
    }

    fn build_context(&self, step: &Step, result: Option<StepOutput>) -> Context {
        let mut metadata = BTreeMap::new();
        metadata.insert(fc_core::meta_keys::SANDBOX_ROOT.to_string(), json!(self.sandbox_root));
        Context {
            tool: step.tool.clone(),
            params: step.params.clone(),
            result,
            expected_output: None,
            step_id: step.id.clone(),
            session_id: None,
            state: BTreeMap::new(),
            metadata,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn step_scope(step: &Step, attempt: u32) -> Value {
    json!({"id": step.id.to_string(), "tool": step.tool, "attempt": attempt})
}

fn error_from_decision(decision: &Decision) -> StepError {
    StepError::new(decision.code.clone(), decision.message.clone(), MAX_ERROR_MESSAGE_LEN)
        .with_detail("validator_id", json!(decision.validator_id))
        .with_detail("evidence", json!(decision.evidence))
}

fn finalize(step: &Step, attempt: u32, started_at: Timestamp, finished_at: Timestamp, terminal: Terminal) -> StepResult {
    let duration = started_at.elapsed_until(finished_at);
    StepResult {
        step_id: step.id.clone(),
        tool: step.tool.clone(),
        status: terminal.status,
        started_at,
        finished_at,
        duration_ms: duration.whole_milliseconds().clamp(i64::MIN.into(), i64::MAX.into()) as i64,
        output: terminal.output,
        error: terminal.error,
        phase: terminal.phase.to_string(),
        attempt,
    }
}

fn level_for_status(status: StepStatus) -> LogLevel {
    match status {
        StepStatus::Ok | StepStatus::Replayed => LogLevel::Info,
        StepStatus::Skipped => LogLevel::Warn,
        StepStatus::Fail | StepStatus::Blocked => LogLevel::Error,
    }
}

fn result_data(result: &StepResult, decision_codes: &[String]) -> Value {
    json!({
        "status": result.status,
        "code": result.error.as_ref().map(|error| error.code.clone()),
        "output": result.output,
        "decisions": decision_codes,
        "duration_ms": result.duration_ms,
    })
}

/// Concatenates every top-level string parameter value, newline-joined,
/// for a sink call's DLP scan. Nested values are not flattened: sink
/// payloads are conventionally a single top-level field (`body`, `log`,
/// `message`), and scanning only strings keeps this cheap.
fn sink_text(params: &Map<String, Value>) -> Option<String> {
    let joined: Vec<&str> = params.values().filter_map(Value::as_str).collect();
    if joined.is_empty() { None } else { Some(joined.join("\n")) }
}

/// Redacts every top-level string parameter value in place via the DLP
/// detector set, leaving non-string values untouched.
fn redact_string_params(params: &mut Map<String, Value>) {
    for value in params.values_mut() {
        if let Value::String(text) = value {
            let (redacted, _hits) = fc_taint::redact(text);
            *value = Value::String(redacted);
        }
    }
}

/// Best-effort target for a predicted side-effect's evidence: the first
/// path-like or network-like parameter value, falling back to `None`.
fn side_effect_target(params: &Map<String, Value>) -> Option<String> {
    const CANDIDATE_KEYS: &[&str] = &["path", "file_path", "relative_path", "url", "host", "hostname", "endpoint", "uri"];
    CANDIDATE_KEYS.iter().find_map(|key| params.get(*key)).and_then(Value::as_str).map(str::to_string)
}
