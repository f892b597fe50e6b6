// system-tests/tests/replay.rs
// ============================================================================
// Module: Replay Scenario
// Description: replaying a historical trace in mock
//              mode injects the cached output on a fingerprint hit and fails
//              closed with `REPLAY_MISS` on a miss.
// ============================================================================

mod support;

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use fc_core::Step;
use fc_core::StepStatus;
use fc_core::codes;
use fc_pipeline::ToolRegistry;
use fc_replay::ReplayMode;
use serde_json::json;

fn read_file_tools(calls: Arc<AtomicUsize>) -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(
        "read_file",
        Arc::new(move |ctx: &fc_core::Context| {
            calls.fetch_add(1, Ordering::SeqCst);
            let path = ctx.params.get("path").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(fc_core::StepOutput::text(format!("contents-of-{path}")))
        }),
    );
    tools
}

#[test]
fn replay_hit_injects_cached_output_without_invoking_tool() {
    let historical_calls = Arc::new(AtomicUsize::new(0));
    let mut historical_run = support::bare_run(read_file_tools(historical_calls.clone()));
    let historical_step = Step::new("r1", "read_file", support::params(json!({"path": "x.txt"})));
    let historical_result = historical_run.run_step(&historical_step);
    assert_eq!(historical_result.status, StepStatus::Ok);
    assert_eq!(historical_calls.load(Ordering::SeqCst), 1);

    let trace_path = historical_run.trace_path().to_path_buf();
    historical_run.flush_trace().expect("historical trace flushes to disk");

    let replay_calls = Arc::new(AtomicUsize::new(0));
    let mut replaying_run = support::bare_run(read_file_tools(replay_calls.clone()))
        .with_replay(&trace_path, ReplayMode::Mock)
        .expect("historical trace is readable");

    let same_step = Step::new("r1", "read_file", support::params(json!({"path": "x.txt"})));
    let result = replaying_run.run_step(&same_step);

    assert_eq!(result.status, StepStatus::Replayed);
    assert_eq!(result.phase, "replay");
    assert_eq!(replay_calls.load(Ordering::SeqCst), 0, "replayed step must not invoke the tool");
    assert_eq!(result.output.expect("historical output injected").value, Some(json!("contents-of-x.txt")));
}

#[test]
fn replay_miss_fails_closed_without_invoking_tool() {
    let historical_calls = Arc::new(AtomicUsize::new(0));
    let mut historical_run = support::bare_run(read_file_tools(historical_calls.clone()));
    let historical_step = Step::new("r1", "read_file", support::params(json!({"path": "x.txt"})));
    historical_run.run_step(&historical_step);
    let trace_path = historical_run.trace_path().to_path_buf();
    historical_run.flush_trace().expect("historical trace flushes to disk");

    let replay_calls = Arc::new(AtomicUsize::new(0));
    let mut replaying_run = support::bare_run(read_file_tools(replay_calls.clone()))
        .with_replay(&trace_path, ReplayMode::Mock)
        .expect("historical trace is readable");

    let different_step = Step::new("r2", "read_file", support::params(json!({"path": "y.txt"})));
    let result = replaying_run.run_step(&different_step);

    assert_eq!(result.status, StepStatus::Fail);
    assert_eq!(result.error.expect("miss carries an error").code, codes::REPLAY_MISS);
    assert_eq!(replay_calls.load(Ordering::SeqCst), 0, "a miss must not fall through to dispatch");
}
