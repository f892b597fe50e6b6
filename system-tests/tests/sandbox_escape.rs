// system-tests/tests/sandbox_escape.rs
// ============================================================================
// Module: Sandbox Escape Scenario
// Description: a path-traversal call against a
//              sandboxed `write_file` tool is blocked before dispatch.
// ============================================================================

mod support;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use fc_core::Step;
use fc_core::StepStatus;
use fc_core::codes;
use fc_pipeline::ToolRegistry;
use serde_json::json;

#[test]
fn sandbox_escape_is_blocked_before_dispatch() {
    let invoked = Arc::new(AtomicBool::new(false));
    let invoked_flag = invoked.clone();

    let mut tools = ToolRegistry::new();
    tools.register(
        "write_file",
        Arc::new(move |_ctx: &fc_core::Context| {
            invoked_flag.store(true, Ordering::SeqCst);
            Ok(fc_core::StepOutput::text("wrote"))
        }),
    );

    let mut run = support::bare_run(tools);
    let step = Step::new(
        "s1",
        "write_file",
        support::params(json!({"path": "../etc/passwd", "content": "root:x:0:0"})),
    );

    let result = run.run_step(&step);

    assert_eq!(result.status, StepStatus::Blocked);
    assert_eq!(result.phase, "validate");
    let error = result.error.expect("blocked result carries an error");
    assert_eq!(error.code, codes::SEC_PATH_TRAVERSAL);
    assert!(!invoked.load(Ordering::SeqCst), "tool must not be invoked once blocked");
}

#[test]
fn path_resolving_inside_sandbox_is_allowed() {
    let mut tools = ToolRegistry::new();
    tools.register("write_file", Arc::new(|_ctx: &fc_core::Context| Ok(fc_core::StepOutput::text("wrote"))));

    let mut run = support::bare_run(tools);
    let step = Step::new("s1", "write_file", support::params(json!({"path": "notes.txt", "content": "hi"})));

    let result = run.run_step(&step);

    assert_eq!(result.status, StepStatus::Ok);
}
