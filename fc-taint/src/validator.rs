// fc-taint/src/validator.rs
// ============================================================================
// Module: Taint Flow Validator
// Description: Opt-in post-analysis validator surfacing taint-flow findings.
// Purpose: Annotate (never block) sinks receiving tainted input above a
//          configured minimum sensitivity.
// Dependencies: fc-core, fc-validate, crate::dlp
// ============================================================================

//! ## Overview
//! Grounded in
//! `examples/original_source/failcore/core/validate/builtin/output/taint.py`.
//! This is a lightweight companion to [`crate::engine::TaintEngine`]: the
//! engine is the enforcement point (BLOCK/SANITIZE/REQUIRE_APPROVAL on
//! sink entry); this validator is a separate, always-WARN annotation pass
//! run through the regular validator engine so taint flow shows up
//! alongside every other validator's decisions in one explanation.
//!
//! Because [`fc_core::Context`] is JSON-serializable, the validator reads
//! its input tags from `context.state["taint_tags"]` — a JSON array of
//! [`fc_core::TaintTag`] the pipeline populates from the live
//! [`crate::store::TaintStore`] before invoking the engine — rather than
//! holding a reference to the store itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use fc_core::Context;
use fc_core::DataSensitivity;
use fc_core::Decision;
use fc_core::TaintTag;
use fc_core::ValidatorConfig;
use fc_validate::BaseValidator;
use fc_validate::ValidatorError;
use serde_json::Value;
use serde_json::json;

/// Validator id.
pub const ID: &str = "taint_flow";

/// Key under [`Context::state`] carrying the step's unioned taint tags as
/// a JSON array, populated by the pipeline before dispatch.
pub const STATE_KEY_TAINT_TAGS: &str = "taint_tags";

/// Default high-risk sinks, matching [`crate::engine::DEFAULT_HIGH_RISK_SINKS`].
const DEFAULT_HIGH_RISK_SINKS: &[&str] = crate::engine::DEFAULT_HIGH_RISK_SINKS;

/// Surfaces taint-flow findings to sinks above a configured minimum
/// sensitivity. Never blocks on its own.
#[derive(Debug, Default)]
pub struct TaintFlowValidator;

impl TaintFlowValidator {
    /// Creates a new validator instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BaseValidator for TaintFlowValidator {
    fn id(&self) -> &str {
        ID
    }

    fn domain(&self) -> &str {
        "security"
    }

    fn config_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "min_sensitivity": {
                    "type": "string",
                    "enum": ["public", "internal", "confidential", "pii", "secret"],
                },
                "high_risk_sinks": { "type": "array", "items": { "type": "string" } },
                "require_explicit_sinks": { "type": "boolean" },
            },
        }))
    }

    fn default_config(&self) -> BTreeMap<String, Value> {
        let mut config = BTreeMap::new();
        config.insert("min_sensitivity".to_string(), json!("confidential"));
        config.insert("high_risk_sinks".to_string(), json!(Vec::<String>::new()));
        config.insert("require_explicit_sinks".to_string(), json!(false));
        config
    }

    fn evaluate(&self, context: &Context, config: &ValidatorConfig) -> Result<Vec<Decision>, ValidatorError> {
        let effective = self.effective_config(config);

        let tags = read_taint_tags(context)?;
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let high_risk_sinks: Vec<String> = effective
            .get("high_risk_sinks")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|item| item.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let require_explicit_sinks = effective.get("require_explicit_sinks").and_then(Value::as_bool).unwrap_or(false);

        if !is_high_risk_sink(&context.tool, &high_risk_sinks, require_explicit_sinks) {
            return Ok(Vec::new());
        }

        let Some(max_sensitivity) = tags.iter().map(|tag| tag.sensitivity).max() else {
            return Ok(Vec::new());
        };

        let min_sensitivity = effective
            .get("min_sensitivity")
            .and_then(Value::as_str)
            .and_then(parse_sensitivity)
            .unwrap_or(DataSensitivity::Confidential);

        if max_sensitivity < min_sensitivity {
            return Ok(Vec::new());
        }

        let code = fc_core::codes::taint_flow_code(sensitivity_label(max_sensitivity));
        let message = format!(
            "taint flow detected: {} data from {} source(s) flowing to high-risk sink '{}'",
            sensitivity_label(max_sensitivity),
            tags.len(),
            context.tool
        );

        let mut decision = Decision::warn(code, ID, message);
        decision.risk_level = risk_level_for(max_sensitivity);
        decision.tool = Some(context.tool.clone());
        decision.step_id = Some(context.step_id.clone());
        decision.evidence = evidence_for(&context.tool, max_sensitivity, &tags, binding_confidence(&tags));
        decision.remediation = Some(fc_core::Remediation {
            suggestion: format!("review data flow from {} source(s) to sink '{}'; consider sanitizing {} data first", tags.len(), context.tool, sensitivity_label(max_sensitivity)),
            reference: None,
        });

        Ok(vec![decision])
    }
}

fn read_taint_tags(context: &Context) -> Result<Vec<TaintTag>, ValidatorError> {
    match context.state.get(STATE_KEY_TAINT_TAGS) {
        None => Ok(Vec::new()),
        Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|error| ValidatorError::InvalidConfig(format!("taint_tags: {error}"))),
    }
}

fn is_high_risk_sink(tool: &str, explicit_sinks: &[String], require_explicit_sinks: bool) -> bool {
    if !explicit_sinks.is_empty() {
        return explicit_sinks.iter().any(|sink| sink == tool);
    }
    if require_explicit_sinks {
        return false;
    }
    DEFAULT_HIGH_RISK_SINKS.contains(&tool)
}

fn parse_sensitivity(value: &str) -> Option<DataSensitivity> {
    match value {
        "public" => Some(DataSensitivity::Public),
        "internal" => Some(DataSensitivity::Internal),
        "confidential" => Some(DataSensitivity::Confidential),
        "pii" => Some(DataSensitivity::Pii),
        "secret" => Some(DataSensitivity::Secret),
        _ => None,
    }
}

fn sensitivity_label(sensitivity: DataSensitivity) -> &'static str {
    match sensitivity {
        DataSensitivity::Public => "public",
        DataSensitivity::Internal => "internal",
        DataSensitivity::Confidential => "confidential",
        DataSensitivity::Pii => "pii",
        DataSensitivity::Secret => "secret",
    }
}

fn risk_level_for(sensitivity: DataSensitivity) -> fc_core::RiskLevel {
    match sensitivity {
        DataSensitivity::Public | DataSensitivity::Internal => fc_core::RiskLevel::Low,
        DataSensitivity::Confidential => fc_core::RiskLevel::Medium,
        DataSensitivity::Pii => fc_core::RiskLevel::High,
        DataSensitivity::Secret => fc_core::RiskLevel::Critical,
    }
}

/// Binding confidence the original tags came from the named sources: high
/// when every tag is an origin tag (`propagation_depth == 0`), medium for
/// a single propagation hop, low beyond that — deeper chains are weaker
/// evidence of a direct binding between source and sink.
fn binding_confidence(tags: &[TaintTag]) -> &'static str {
    let max_depth = tags.iter().map(|tag| tag.propagation_depth).max().unwrap_or(0);
    match max_depth {
        0 => "high",
        1 => "medium",
        _ => "low",
    }
}

fn evidence_for(tool: &str, sensitivity: DataSensitivity, tags: &[TaintTag], confidence: &str) -> BTreeMap<String, Value> {
    let mut evidence = BTreeMap::new();
    evidence.insert("tool".to_string(), json!(tool));
    evidence.insert("sink_type".to_string(), json!("high_risk"));
    evidence.insert("sensitivity".to_string(), json!(sensitivity_label(sensitivity)));
    evidence.insert("taint_count".to_string(), json!(tags.len()));
    evidence.insert("binding_confidence".to_string(), json!(confidence));
    evidence.insert(
        "source_tools".to_string(),
        json!(tags.iter().map(|tag| tag.source_tool.clone()).collect::<BTreeSet<_>>()),
    );
    evidence.insert(
        "source_step_ids".to_string(),
        json!(tags.iter().map(|tag| tag.source_step_id.to_string()).collect::<BTreeSet<_>>()),
    );
    evidence
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
    use fc_core::EnforcementMode;
    use fc_core::StepId;

    use super::*;

    fn context_with_tags(tool: &str, tags: Vec<TaintTag>) -> Context {
        Context {
            tool: tool.to_string(),
            params: serde_json::Map::new(),
            result: None,
            expected_output: None,
            step_id: StepId::new("s2"),
            session_id: None,
            state: BTreeMap::from([(STATE_KEY_TAINT_TAGS.to_string(), serde_json::to_value(tags).unwrap())]),
            metadata: BTreeMap::new(),
        }
    }

    fn config() -> ValidatorConfig {
        ValidatorConfig {
            enabled: true,
            enforcement: EnforcementMode::Block,
            domain: "security".to_string(),
            priority: 0,
            config: BTreeMap::new(),
            exceptions: Vec::new(),
            allow_override: false,
        }
    }

    #[test]
    fn no_taint_tags_produces_no_decisions() {
        let validator = TaintFlowValidator::new();
        let context = context_with_tags("send_email", Vec::new());
        let decisions = validator.evaluate(&context, &config()).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn non_sink_tool_produces_no_decisions() {
        let validator = TaintFlowValidator::new();
        let tag = TaintTag::origin(DataSensitivity::Secret, "api_key", "read_file", StepId::new("s1"));
        let context = context_with_tags("read_file", vec![tag]);
        let decisions = validator.evaluate(&context, &config()).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn sink_with_confidential_and_above_warns() {
        let validator = TaintFlowValidator::new();
        let tag = TaintTag::origin(DataSensitivity::Pii, "customer_email", "read_file", StepId::new("s1"));
        let context = context_with_tags("send_email", vec![tag]);
        let decisions = validator.evaluate(&context, &config()).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].outcome, fc_core::DecisionOutcome::Warn);
        assert_eq!(decisions[0].evidence.get("binding_confidence").and_then(Value::as_str), Some("high"));
    }

    #[test]
    fn below_minimum_sensitivity_produces_no_decisions() {
        let validator = TaintFlowValidator::new();
        let tag = TaintTag::origin(DataSensitivity::Internal, "note", "read_file", StepId::new("s1"));
        let context = context_with_tags("send_email", vec![tag]);
        let decisions = validator.evaluate(&context, &config()).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn deeper_propagation_lowers_binding_confidence() {
        let validator = TaintFlowValidator::new();
        let tag = TaintTag::origin(DataSensitivity::Secret, "api_key", "read_file", StepId::new("s1")).propagated().propagated();
        let context = context_with_tags("send_email", vec![tag]);
        let decisions = validator.evaluate(&context, &config()).unwrap();
        assert_eq!(decisions[0].evidence.get("binding_confidence").and_then(Value::as_str), Some("low"));
    }
}
