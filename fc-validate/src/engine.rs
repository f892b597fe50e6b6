// fc-validate/src/engine.rs
// ============================================================================
// Module: Validation Engine
// Description: Policy-as-data orchestrator running validators in order.
// Purpose: Turn a `Context` + `Policy` into an ordered list of `Decision`s.
// Dependencies: fc-core, fc-policy, crate::{validator, dedup, explain}
// ============================================================================

//! ## Overview
//! The engine selects which registered validators participate, sorts them
//! deterministically, checks per-validator exceptions, calls each
//! validator, applies enforcement mode and break-glass override, and
//! (optionally) deduplicates and explains the result. None of this is
//! validator-specific: every validator, built-in or plugin, is treated
//! identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use fc_core::Context;
use fc_core::Decision;
use fc_core::DecisionOutcome;
use fc_core::EnforcementMode;
use fc_core::Exception;
use fc_core::GlobalOverride;
use fc_core::Policy;
use fc_core::Timestamp;
use fc_core::ValidatorConfig;
use fc_policy::is_override_active;
use serde_json::json;

use crate::dedup::DecisionWithDomain;
use crate::dedup::deduplicate;
use crate::explain::DecisionExplanation;
use crate::explain::explain;
use crate::validator::ValidatorRegistry;

// ============================================================================
// SECTION: Domain Ordering (Execution Order)
// ============================================================================

/// Execution-order priority for a validator's domain: lower values run
/// first. This is distinct from [`crate::dedup::dedup_domain_priority`],
/// which ranks domains for *dedup primary selection*, not ordering.
fn execution_domain_rank(domain: &str) -> i32 {
    match domain {
        "contract" => 0,
        "type" => 1,
        "security" => 2,
        "network" => 3,
        "resource" => 4,
        _ => 5,
    }
}

// ============================================================================
// SECTION: Evaluation Options
// ============================================================================

/// Per-call options for [`ValidationEngine::evaluate`].
#[derive(Debug, Clone, Copy)]
pub struct EvaluateOptions {
    /// Current time, used to expire exceptions and the global override.
    /// Missing time is fail-closed (callers must always supply it; there
    /// is deliberately no `Option` here or a default-to-now fallback).
    pub now: Timestamp,
    /// Whether the global override's token environment variable is
    /// present and non-empty for this call.
    pub override_token_present: bool,
    /// When `true`, evaluation stops at the first decision that remains
    /// `Block` after enforcement and override have been applied.
    pub strict: bool,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Orchestrates validator selection, ordering, and enforcement for one
/// [`Policy`] and [`ValidatorRegistry`].
pub struct ValidationEngine<'a> {
    policy: &'a Policy,
    registry: &'a ValidatorRegistry,
}

impl<'a> ValidationEngine<'a> {
    /// Builds an engine over a loaded policy and validator registry.
    #[must_use]
    pub const fn new(policy: &'a Policy, registry: &'a ValidatorRegistry) -> Self {
        Self { policy, registry }
    }

    /// Runs every selected validator against `context` and returns the
    /// ordered decisions after enforcement mode and override have been
    /// applied, but *before* deduplication (see [`Self::evaluate_deduped`]).
    #[must_use]
    pub fn evaluate(&self, context: &Context, options: EvaluateOptions) -> Vec<Decision> {
        let break_glass_active = is_override_active(&self.policy.global_override, options.override_token_present, options.now);

        let mut ordered: Vec<(&str, &ValidatorConfig)> = self.selected_validators();
        ordered.sort_by(|(id_a, cfg_a), (id_b, cfg_b)| {
            cfg_a
                .priority
                .cmp(&cfg_b.priority)
                .then_with(|| execution_domain_rank(&cfg_a.domain).cmp(&execution_domain_rank(&cfg_b.domain)))
                .then_with(|| id_a.cmp(id_b))
        });

        let mut decisions = Vec::new();
        for (id, config) in ordered {
            let Some(validator) = self.registry.get(id) else { continue };

            if let Some(exception_decision) = active_exception_decision(id, &config.exceptions, context, options.now) {
                decisions.push(exception_decision);
                continue;
            }

            let validator_decisions = match validator.evaluate(context, config) {
                Ok(decisions) => decisions,
                Err(error) => {
                    let mut decision =
                        Decision::block(fc_core::codes::ENGINE_VALIDATOR_ERROR, id, format!("validator '{id}' raised: {error}"));
                    decision.tool = Some(context.tool.clone());
                    decision.step_id = Some(context.step_id.clone());
                    vec![decision]
                }
            };

            for mut decision in validator_decisions {
                apply_enforcement(&mut decision, config.enforcement);
                apply_override(&mut decision, config, &self.policy.global_override, break_glass_active);
                let is_blocking = decision.is_blocking();
                decisions.push(decision);
                if options.strict && is_blocking {
                    return decisions;
                }
            }
        }
        decisions
    }

    /// Runs [`Self::evaluate`] and deduplicates the result.
    #[must_use]
    pub fn evaluate_deduped(&self, context: &Context, options: EvaluateOptions) -> Vec<Decision> {
        let decisions = self.evaluate(context, options);
        let with_domain = decisions
            .into_iter()
            .map(|decision| {
                let domain = self
                    .registry
                    .get(&decision.validator_id)
                    .map(|validator| validator.domain().to_string())
                    .unwrap_or_else(|| "audit".to_string());
                DecisionWithDomain { decision, domain }
            })
            .collect();
        deduplicate(with_domain)
    }

    /// Runs [`Self::evaluate_deduped`] and builds a [`DecisionExplanation`].
    #[must_use]
    pub fn explain(&self, context: &Context, options: EvaluateOptions) -> (Vec<Decision>, DecisionExplanation) {
        let break_glass_active = is_override_active(&self.policy.global_override, options.override_token_present, options.now);
        let decisions = self.evaluate_deduped(context, options);
        let explanation = explain(&decisions, break_glass_active);
        (decisions, explanation)
    }

    /// Selects the `(id, config)` pairs that participate in this
    /// evaluation. When the policy has no validator entries at all, every
    /// registered validator is considered enabled with a synthesized
    /// default-domain config. When the policy is non-empty, a validator
    /// must have an explicit, enabled config entry to participate: a
    /// non-empty policy is an explicit opt-in surface, not an overlay on
    /// top of implicit defaults (see `DESIGN.md` for this Open Question
    /// resolution).
    fn selected_validators(&self) -> Vec<(&'a str, &'a ValidatorConfig)> {
        if self.policy.is_empty() {
            return self.registry.iter().map(|validator| (validator.id(), DEFAULT_VALIDATOR_CONFIG.get_or_init(default_config))).collect();
        }
        self.policy
            .validators
            .iter()
            .filter(|(_, config)| config.enabled)
            .filter_map(|(id, config)| self.registry.get(id).map(|validator| (validator.id(), config)))
            .collect()
    }
}

static DEFAULT_VALIDATOR_CONFIG: std::sync::OnceLock<ValidatorConfig> = std::sync::OnceLock::new();

fn default_config() -> ValidatorConfig {
    ValidatorConfig {
        enabled: true,
        enforcement: EnforcementMode::Block,
        domain: "unspecified".to_string(),
        priority: 0,
        config: std::collections::BTreeMap::new(),
        exceptions: Vec::new(),
        allow_override: false,
    }
}

// ============================================================================
// SECTION: Exceptions
// ============================================================================

fn active_exception_decision(validator_id: &str, exceptions: &[Exception], context: &Context, now: Timestamp) -> Option<Decision> {
    let active = exceptions.iter().find(|exception| is_exception_active(exception, context, now))?;
    let mut decision = Decision::allow(
        fc_core::codes::exception_code(validator_id),
        validator_id,
        format!("Exception '{}' active: {}", active.rule_id, active.reason),
    );
    decision.tool = Some(context.tool.clone());
    decision.step_id = Some(context.step_id.clone());
    decision.evidence.insert("rule_id".to_string(), json!(active.rule_id));
    decision.evidence.insert("reason".to_string(), json!(active.reason));
    Some(decision)
}

/// An exception is active only when it has not expired (a missing expiry
/// is fail-closed, i.e. treated as already expired) and its scope, if
/// any, matches the current tool and optional parameter.
fn is_exception_active(exception: &Exception, context: &Context, now: Timestamp) -> bool {
    let Some(expires_at) = exception.expires_at else { return false };
    if expires_at <= now {
        return false;
    }
    match &exception.scope {
        None => true,
        Some(scope) => {
            if scope.tool != context.tool {
                return false;
            }
            match &scope.param {
                None => true,
                Some(param) => context.params.contains_key(param),
            }
        }
    }
}

// ============================================================================
// SECTION: Enforcement & Override
// ============================================================================

/// Downgrades a `Block` outcome to `Warn` under shadow/warn enforcement,
/// recording the original outcome in evidence. `Warn` and `Allow`
/// decisions from a validator are never escalated by enforcement mode.
fn apply_enforcement(decision: &mut Decision, mode: EnforcementMode) {
    if decision.outcome != DecisionOutcome::Block {
        return;
    }
    if matches!(mode, EnforcementMode::Shadow | EnforcementMode::Warn) {
        decision.evidence.insert("enforcement_downgraded_from".to_string(), json!("block"));
        decision.evidence.insert("enforcement_mode".to_string(), json!(format!("{mode:?}").to_lowercase()));
        decision.outcome = DecisionOutcome::Warn;
    }
}

/// Downgrades a `Block` decision to `Allow` when the validator allows
/// override, the decision itself opts in (`overrideable`), and the
/// global break-glass override is active.
fn apply_override(decision: &mut Decision, config: &ValidatorConfig, _global: &GlobalOverride, break_glass_active: bool) {
    if decision.outcome != DecisionOutcome::Block {
        return;
    }
    if config.allow_override && decision.overrideable && break_glass_active {
        decision.outcome = DecisionOutcome::Allow;
        decision.evidence.insert("override_active".to_string(), json!(true));
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
    use std::collections::BTreeMap;

    use fc_core::ExceptionScope;
    use fc_core::StepId;
    use fc_core::TaintTag;
    use time::Duration;

    use super::*;
    use crate::builtin::register_builtins;

    fn ctx(tool: &str, params: serde_json::Value) -> Context {
        let serde_json::Value::Object(map) = params else { unreachable!("test fixture must be an object") };
        Context {
            tool: tool.to_string(),
            params: map,
            result: None,
            expected_output: None,
            step_id: StepId::new("s1"),
            session_id: None,
            state: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn registry() -> ValidatorRegistry {
        let mut registry = ValidatorRegistry::new();
        register_builtins(&mut registry).unwrap();
        registry
    }

    #[test]
    fn empty_policy_enables_every_validator() {
        let policy = Policy::default();
        let registry = registry();
        let engine = ValidationEngine::new(&policy, &registry);
        let context = ctx("write_file", json!({"path": "../escape"}));
        let decisions =
            engine.evaluate(&context, EvaluateOptions { now: Timestamp::now(), override_token_present: false, strict: false });
        assert!(decisions.iter().any(|decision| decision.code == fc_core::codes::SEC_PATH_TRAVERSAL));
    }

    #[test]
    fn nonempty_policy_requires_explicit_enable() {
        let mut policy = Policy::default();
        policy.validators.insert(
            "network_ssrf".to_string(),
            ValidatorConfig {
                enabled: true,
                enforcement: EnforcementMode::Block,
                domain: "network".to_string(),
                priority: 0,
                config: BTreeMap::new(),
                exceptions: Vec::new(),
                allow_override: false,
            },
        );
        let registry = registry();
        let engine = ValidationEngine::new(&policy, &registry);
        let context = ctx("write_file", json!({"path": "../escape"}));
        let decisions =
            engine.evaluate(&context, EvaluateOptions { now: Timestamp::now(), override_token_present: false, strict: false });
        assert!(decisions.is_empty(), "path validator was not explicitly enabled, so it must not run");
    }

    #[test]
    fn shadow_enforcement_downgrades_block_to_warn() {
        let mut policy = Policy::default();
        policy.validators.insert(
            "security_path_traversal".to_string(),
            ValidatorConfig {
                enabled: true,
                enforcement: EnforcementMode::Shadow,
                domain: "security".to_string(),
                priority: 0,
                config: BTreeMap::new(),
                exceptions: Vec::new(),
                allow_override: false,
            },
        );
        let registry = registry();
        let engine = ValidationEngine::new(&policy, &registry);
        let context = ctx("write_file", json!({"path": "../escape"}));
        let decisions =
            engine.evaluate(&context, EvaluateOptions { now: Timestamp::now(), override_token_present: false, strict: false });
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].outcome, DecisionOutcome::Warn);
    }

    #[test]
    fn active_exception_short_circuits_validator() {
        let mut policy = Policy::default();
        let mut config = ValidatorConfig {
            enabled: true,
            enforcement: EnforcementMode::Block,
            domain: "security".to_string(),
            priority: 0,
            config: BTreeMap::new(),
            exceptions: Vec::new(),
            allow_override: false,
        };
        config.exceptions.push(Exception {
            rule_id: "legacy-migration".to_string(),
            reason: "temporary migration script".to_string(),
            expires_at: Some(Timestamp::from_offset(Timestamp::now().as_offset() + Duration::hours(1))),
            scope: Some(ExceptionScope { tool: "write_file".to_string(), param: None }),
            created_by: None,
            created_at: None,
        });
        policy.validators.insert("security_path_traversal".to_string(), config);
        let registry = registry();
        let engine = ValidationEngine::new(&policy, &registry);
        let context = ctx("write_file", json!({"path": "../escape"}));
        let decisions =
            engine.evaluate(&context, EvaluateOptions { now: Timestamp::now(), override_token_present: false, strict: false });
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].outcome, DecisionOutcome::Allow);
        assert!(decisions[0].code.starts_with("FC_EXCEPTION_"));
    }

    #[test]
    fn missing_expiry_is_fail_closed() {
        let mut policy = Policy::default();
        let mut config = ValidatorConfig {
            enabled: true,
            enforcement: EnforcementMode::Block,
            domain: "security".to_string(),
            priority: 0,
            config: BTreeMap::new(),
            exceptions: Vec::new(),
            allow_override: false,
        };
        config.exceptions.push(Exception {
            rule_id: "no-expiry".to_string(),
            reason: "should not be active".to_string(),
            expires_at: None,
            scope: None,
            created_by: None,
            created_at: None,
        });
        policy.validators.insert("security_path_traversal".to_string(), config);
        let registry = registry();
        let engine = ValidationEngine::new(&policy, &registry);
        let context = ctx("write_file", json!({"path": "../escape"}));
        let decisions =
            engine.evaluate(&context, EvaluateOptions { now: Timestamp::now(), override_token_present: false, strict: false });
        assert_eq!(decisions[0].code, fc_core::codes::SEC_PATH_TRAVERSAL);
    }

    #[test]
    fn override_requires_both_validator_and_decision_opt_in() {
        let mut decision = Decision::block("FC_X", "v", "msg");
        decision.overrideable = false;
        let config = ValidatorConfig {
            enabled: true,
            enforcement: EnforcementMode::Block,
            domain: "security".to_string(),
            priority: 0,
            config: BTreeMap::new(),
            exceptions: Vec::new(),
            allow_override: true,
        };
        let global = GlobalOverride { enabled: true, require_token: false, token_env_var: String::new(), expires_at: None };
        apply_override(&mut decision, &config, &global, true);
        assert_eq!(decision.outcome, DecisionOutcome::Block, "decision did not opt in via overrideable");
    }

    #[test]
    fn evaluate_deduped_leaves_distinct_decisions_untouched() {
        let mut policy = Policy::default();
        let config = ValidatorConfig {
            enabled: true,
            enforcement: EnforcementMode::Block,
            domain: "security".to_string(),
            priority: 0,
            config: BTreeMap::new(),
            exceptions: Vec::new(),
            allow_override: false,
        };
        policy.validators.insert("security_path_traversal".to_string(), config.clone());
        policy.validators.insert("network_ssrf".to_string(), config);
        let registry = registry();
        let engine = ValidationEngine::new(&policy, &registry);
        let context = ctx("write_file", json!({"path": "../escape", "url": "http://169.254.169.254/"}));
        let options = EvaluateOptions { now: Timestamp::now(), override_token_present: false, strict: false };

        let plain = engine.evaluate(&context, options);
        assert!(plain.iter().all(|decision| decision.suppressed_by.is_none()));

        let deduped = engine.evaluate_deduped(&context, options);
        assert_eq!(deduped.len(), plain.len(), "path and ssrf decisions carry distinct evidence and must not collapse");
        assert!(deduped.iter().filter(|decision| decision.outcome == DecisionOutcome::Block).count() >= 2);
    }
}
