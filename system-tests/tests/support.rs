// system-tests/tests/support.rs
// ============================================================================
// Module: System Test Support
// Description: Shared helpers for constructing a minimal, fully-wired `Run`.
// Purpose: Avoid repeating the same collaborator bootstrap in every scenario.
// ============================================================================

#![allow(dead_code, reason = "not every scenario file uses every helper")]

use fc_core::Policy;
use fc_core::Timestamp;
use fc_core::RunId;
use fc_core::TraceId;
use fc_pipeline::Run;
use fc_pipeline::ToolRegistry;
use fc_semantic::SemanticGuard;
use fc_semantic::SemanticGuardConfig;
use fc_semantic::builtin_rules;
use fc_taint::TaintEngine;
use fc_taint::TaintEngineConfig;
use fc_trace::TraceContext;
use fc_trace::TraceWriter;
use fc_validate::ValidatorRegistry;
use fc_validate::builtin::register_builtins;
use tempfile::TempDir;

/// Builds a `Run` with every built-in validator registered, the semantic
/// guard wired up (but disabled by default, matching the
/// zero-cost default posture), default taint config, and a trace file
/// under a leaked temp directory that outlives the test process.
pub fn bare_run(tools: ToolRegistry) -> Run {
    let dir = TempDir::new().expect("tempdir");
    let sandbox_root = dir.path().join("sandbox");
    std::fs::create_dir_all(&sandbox_root).expect("create sandbox dir");
    let trace_path = dir.path().join("trace.jsonl");
    // Leak the directory so it outlives this helper call; system tests are
    // short-lived processes and do not need the cleanup.
    let _ = dir.keep();

    let mut validators = ValidatorRegistry::new();
    register_builtins(&mut validators).expect("register built-ins");

    let mut rules = fc_semantic::RuleRegistry::new();
    builtin_rules::register_builtins(&mut rules).expect("register semantic rules");
    let semantic_guard = SemanticGuard::new(SemanticGuardConfig::default(), rules);

    let taint_engine = TaintEngine::new(TaintEngineConfig::default());

    let run_id = RunId::new("system-test-run");
    let trace_context = TraceContext::new(run_id.clone(), TraceId::new(run_id.as_str()), Timestamp::now(), sandbox_root.to_string_lossy().into_owned(), Vec::new());
    let trace = TraceWriter::open(trace_path, trace_context).expect("open trace writer");

    Run::new(Policy::default(), validators, semantic_guard, taint_engine, tools, trace, sandbox_root.to_string_lossy().into_owned())
}

/// Shorthand for building a step's parameter map from a `json!` object.
pub fn params(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other:?}"),
    }
}
