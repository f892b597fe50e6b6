// system-tests/tests/output_contract_drift.rs
// ============================================================================
// Module: Output Contract Scenario
// Description: a tool declares `expected_kind=JSON`
//              but returns text; the step still succeeds with a WARN.
// ============================================================================

mod support;

use std::sync::Arc;

use fc_core::OutputContract;
use fc_core::Step;
use fc_core::StepOutputKind;
use fc_core::StepStatus;
use fc_core::codes;
use fc_pipeline::ToolRegistry;
use serde_json::json;

#[test]
fn declared_json_but_observed_text_warns_without_blocking() {
    let mut tools = ToolRegistry::new();
    tools.register("summarize", Arc::new(|_ctx: &fc_core::Context| Ok(fc_core::StepOutput::text("not json"))));

    let mut run = support::bare_run(tools);
    let mut step = Step::new("s1", "summarize", support::params(json!({"input": "hello"})));
    step.expected_output = Some(OutputContract { expected_kind: StepOutputKind::Json, schema: None, strict: false });

    let result = run.run_step(&step);

    assert_eq!(result.status, StepStatus::Ok);
    assert_eq!(result.phase, "contract");
    let output = result.output.expect("observed output is preserved, never reshaped");
    assert_eq!(output.kind, StepOutputKind::Text);

    run.flush_trace().expect("trace flushes to disk");
    let events = fc_trace::read_events(run.trace_path()).expect("trace readable").events;
    let normalized = events.iter().find(|event| matches!(event.event.event_type, fc_core::EventType::OutputNormalized)).expect("OUTPUT_NORMALIZED event recorded");
    assert_eq!(normalized.event.data.get("code").and_then(|v| v.as_str()), Some(codes::OUTPUT_CONTRACT_TYPE_MISMATCH));
}

#[test]
fn strict_contract_mismatch_blocks() {
    let mut tools = ToolRegistry::new();
    tools.register("summarize", Arc::new(|_ctx: &fc_core::Context| Ok(fc_core::StepOutput::text("not json"))));

    let mut run = support::bare_run(tools);
    let mut step = Step::new("s1", "summarize", support::params(json!({"input": "hello"})));
    step.expected_output = Some(OutputContract { expected_kind: StepOutputKind::Json, schema: None, strict: true });

    let result = run.run_step(&step);

    assert_eq!(result.status, StepStatus::Blocked);
    assert_eq!(result.phase, "contract");
}
