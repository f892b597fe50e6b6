// system-tests/tests/invariants.rs
// ============================================================================
// Module: Cross-Cutting Invariants
// Description: cross-cutting invariants, each exercised against the
//              real public API rather than restated as prose.
// ============================================================================

mod support;

use std::sync::Arc;

use fc_core::Decision;
use fc_core::RiskLevel;
use fc_core::fingerprint_params;
use fc_pipeline::ToolRegistry;
use fc_policy::PolicyFormat;
use fc_policy::dump_policy_str;
use fc_policy::parse_policy_str;
use fc_validate::dedup::DecisionWithDomain;
use fc_validate::dedup::deduplicate;
use serde_json::json;

/// Every emitted trace event's `seq` strictly increases within a run, even
/// across multiple steps.
#[test]
fn sequence_numbers_strictly_increase_across_steps() {
    let mut tools = ToolRegistry::new();
    tools.register("noop", Arc::new(|_ctx: &fc_core::Context| Ok(fc_core::StepOutput::text("ok"))));

    let mut run = support::bare_run(tools);
    for index in 0..5 {
        let step = fc_core::Step::new(format!("s{index}"), "noop", support::params(json!({"n": index})));
        run.run_step(&step);
    }
    run.flush_trace().expect("trace flushes to disk");

    let events = fc_trace::read_events(run.trace_path()).expect("trace readable").events;
    assert!(events.len() > 1);
    let mut previous = None;
    for event in &events {
        if let Some(prev) = previous {
            assert!(event.seq > prev, "seq must strictly increase: {prev} then {}", event.seq);
        }
        previous = Some(event.seq);
    }
}

/// Fingerprinting is invariant under top-level and nested key reordering.
#[test]
fn fingerprint_is_stable_under_key_reordering() {
    let ordered = support::params(json!({
        "url": "https://api.stripe.com/v1/charges",
        "headers": {"accept": "application/json", "authorization": "Bearer xyz"},
        "amount": 100
    }));
    let reordered = support::params(json!({
        "amount": 100,
        "headers": {"authorization": "Bearer xyz", "accept": "application/json"},
        "url": "https://api.stripe.com/v1/charges"
    }));

    let a = fingerprint_params("http_post", &ordered).expect("fingerprint computes");
    let b = fingerprint_params("http_post", &reordered).expect("fingerprint computes");
    assert_eq!(a, b, "key order must not affect the fingerprint");

    let different_tool = fingerprint_params("http_get", &ordered).expect("fingerprint computes");
    assert_ne!(a, different_tool, "tool name is part of the fingerprint's identity");
}

/// `dump_policy_str` followed by `parse_policy_str` round-trips losslessly
/// through both supported formats.
#[test]
fn policy_round_trips_through_yaml_and_json() {
    let mut policy = fc_core::Policy::default();
    policy.validators.insert(
        "security_path_traversal".to_string(),
        fc_core::ValidatorConfig {
            enabled: true,
            enforcement: fc_core::EnforcementMode::Block,
            domain: "security".to_string(),
            priority: 100,
            config: Default::default(),
            exceptions: Vec::new(),
            allow_override: false,
        },
    );

    for format in [PolicyFormat::Yaml, PolicyFormat::Json] {
        let dumped = dump_policy_str(&policy, format).expect("policy dumps");
        let reloaded = parse_policy_str(&dumped, format).expect("policy reparses");
        assert_eq!(policy, reloaded, "policy must round-trip through {format:?} unchanged");
    }
}

/// Deduplication never leaves two decisions with `outcome == Block` in the
/// same `(tool, code, evidence)` group; the sibling is downgraded and
/// annotated with `suppressed_by`.
#[test]
fn dedup_never_leaves_two_blocking_decisions_in_one_group() {
    let mut security = Decision::block("FC_SEC_PATH_TRAVERSAL", "security_path_traversal", "escape detected");
    security.tool = Some("write_file".to_string());
    security.risk_level = RiskLevel::High;
    security.evidence.insert("path".to_string(), json!("../etc/passwd"));

    let mut semantic = Decision::block("FC_SEC_PATH_TRAVERSAL", "semantic_path_rule", "escape detected");
    semantic.tool = Some("write_file".to_string());
    semantic.risk_level = RiskLevel::High;
    semantic.evidence.insert("path".to_string(), json!("../etc/passwd"));
    semantic.rule_id = Some("FC_SEC_PATH_TRAVERSAL".to_string());

    let decisions = vec![
        DecisionWithDomain { decision: security, domain: "security".to_string() },
        DecisionWithDomain { decision: semantic, domain: "semantic".to_string() },
    ];

    let deduped = deduplicate(decisions);
    assert_eq!(deduped.len(), 2, "dedup annotates siblings, it does not drop them");

    let blocking_count = deduped.iter().filter(|decision| decision.outcome == fc_core::DecisionOutcome::Block).count();
    assert_eq!(blocking_count, 1, "only the highest-priority domain's decision may still block");

    let suppressed = deduped.iter().find(|decision| decision.suppressed_by.is_some()).expect("one sibling is suppressed");
    assert_eq!(suppressed.validator_id, "semantic_path_rule", "lower-priority domain is the one suppressed");
    assert_eq!(suppressed.outcome, fc_core::DecisionOutcome::Allow, "suppressed block is downgraded to allow");
}
