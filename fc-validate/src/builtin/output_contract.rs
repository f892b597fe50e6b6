// fc-validate/src/builtin/output_contract.rs
// ============================================================================
// Module: Output Contract Validator
// Description: Compares a step's observed output against its declared contract.
// Purpose: Surface drift between declared and observed output shape as a decision.
// Dependencies: fc-core, fc-validate::validator, jsonschema
// ============================================================================

//! ## Overview
//! This validator is post-execution: it only produces decisions when
//! `context.result` is present. It never blocks on its own unless the
//! step declared `strict: true`; by default a mismatch is a `warn`
//! decision that the pipeline's Output Contract stage (§4.1 stage 7)
//! surfaces as an `OUTPUT_NORMALIZED` trace event. Evidence never
//! contains raw output excerpts — only observed/expected kinds, missing
//! field names, and a truncated schema-error preview.

use std::collections::BTreeMap;

use fc_core::Context;
use fc_core::Decision;
use fc_core::DecisionOutcome;
use fc_core::StepOutputKind;
use fc_core::ValidatorConfig;
use fc_core::model::truncate_with_suffix;
use jsonschema::Draft;
use serde_json::Value;
use serde_json::json;

use crate::validator::BaseValidator;
use crate::validator::ValidatorError;

/// Validator id.
pub const ID: &str = "output_contract";

/// Maximum length of a schema-error preview kept in evidence.
const ERROR_PREVIEW_LEN: usize = 200;

/// Compares a step's observed output against its declared [`fc_core::OutputContract`].
#[derive(Debug, Default)]
pub struct OutputContractValidator;

impl OutputContractValidator {
    /// Creates a new validator instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BaseValidator for OutputContractValidator {
    fn id(&self) -> &str {
        ID
    }

    fn domain(&self) -> &str {
        "contract"
    }

    fn default_config(&self) -> BTreeMap<String, Value> {
        BTreeMap::new()
    }

    fn evaluate(&self, context: &Context, _config: &ValidatorConfig) -> Result<Vec<Decision>, ValidatorError> {
        let Some(contract) = &context.expected_output else {
            return Ok(Vec::new());
        };
        let Some(output) = &context.result else {
            return Ok(Vec::new());
        };

        let outcome = if contract.strict { DecisionOutcome::Block } else { DecisionOutcome::Warn };
        let mut decisions = Vec::new();

        if output.kind != contract.expected_kind {
            decisions.push(kind_mismatch_decision(context, contract.expected_kind, output.kind, outcome));
        }

        if let Some(schema) = &contract.schema {
            match (output.kind, &output.value) {
                (StepOutputKind::Json, Some(value)) => {
                    decisions.extend(check_schema(context, schema, value, outcome));
                }
                (_, Some(Value::String(text))) => {
                    if serde_json::from_str::<Value>(text).is_err() {
                        decisions.push(invalid_json_decision(context, outcome));
                    }
                }
                _ => {}
            }
        }

        Ok(decisions)
    }
}

fn base_decision(context: &Context, code: &str, message: String, outcome: DecisionOutcome) -> Decision {
    let mut decision = match outcome {
        DecisionOutcome::Block => Decision::block(code, ID, message),
        _ => Decision::warn(code, ID, message),
    };
    decision.tool = Some(context.tool.clone());
    decision.step_id = Some(context.step_id.clone());
    decision.risk_level = fc_core::RiskLevel::Low;
    decision
}

fn kind_mismatch_decision(
    context: &Context,
    expected: StepOutputKind,
    observed: StepOutputKind,
    outcome: DecisionOutcome,
) -> Decision {
    let mut decision = base_decision(
        context,
        fc_core::codes::OUTPUT_CONTRACT_TYPE_MISMATCH,
        format!("Observed output kind {observed:?} does not match expected {expected:?}"),
        outcome,
    );
    decision.evidence.insert("drift_type".to_string(), json!("output_kind_mismatch"));
    decision.evidence.insert("expected_kind".to_string(), json!(format!("{expected:?}").to_lowercase()));
    decision.evidence.insert("observed_kind".to_string(), json!(format!("{observed:?}").to_lowercase()));
    decision
}

fn invalid_json_decision(context: &Context, outcome: DecisionOutcome) -> Decision {
    let mut decision = base_decision(
        context,
        fc_core::codes::OUTPUT_CONTRACT_INVALID_JSON,
        "Output declared a JSON schema but the observed value is not valid JSON".to_string(),
        outcome,
    );
    decision.evidence.insert("drift_type".to_string(), json!("invalid_json"));
    decision
}

/// Checks `value` against a Draft-7-subset JSON Schema, evaluating `type`,
/// `required`, `properties`, `items`, and `enum` as described in §4.1.
fn check_schema(context: &Context, schema: &Value, value: &Value, outcome: DecisionOutcome) -> Vec<Decision> {
    let missing_required = missing_required_fields(schema, value);
    if !missing_required.is_empty() {
        let mut decision = base_decision(
            context,
            fc_core::codes::OUTPUT_CONTRACT_MISSING_FIELDS,
            format!("Output JSON is missing required field(s): {}", missing_required.join(", ")),
            outcome,
        );
        decision.evidence.insert("drift_type".to_string(), json!("missing_required_fields"));
        decision.evidence.insert("missing_required_fields".to_string(), json!(missing_required));
        return vec![decision];
    }

    let Ok(validator) = jsonschema::options().with_draft(Draft::Draft7).build(schema) else {
        return Vec::new();
    };
    if let Err(error) = validator.validate(value) {
        let preview = truncate_with_suffix(&error.to_string(), ERROR_PREVIEW_LEN);
        let mut decision = base_decision(
            context,
            fc_core::codes::OUTPUT_CONTRACT_SCHEMA_MISMATCH,
            "Output JSON does not match the declared schema".to_string(),
            outcome,
        );
        decision.evidence.insert("drift_type".to_string(), json!("schema_mismatch"));
        decision.evidence.insert("error_preview".to_string(), json!(preview));
        return vec![decision];
    }
    Vec::new()
}

/// Extracts the schema's top-level `required` array and returns the subset
/// absent from `value`, without invoking the full schema compiler — this
/// keeps `missing_required_fields` evidence exact even when other parts of
/// the schema are unrelated to presence.
fn missing_required_fields(schema: &Value, value: &Value) -> Vec<String> {
    let Some(required) = schema.get("required").and_then(Value::as_array) else {
        return Vec::new();
    };
    let Value::Object(map) = value else {
        return required.iter().filter_map(|entry| entry.as_str().map(str::to_string)).collect();
    };
    required
        .iter()
        .filter_map(Value::as_str)
        .filter(|field| !map.contains_key(*field))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use fc_core::OutputContract;
    use fc_core::StepId;
    use fc_core::StepOutput;

    use super::*;

    fn base_config() -> ValidatorConfig {
        ValidatorConfig {
            enabled: true,
            enforcement: fc_core::EnforcementMode::Block,
            domain: "contract".to_string(),
            priority: 0,
            config: BTreeMap::new(),
            exceptions: Vec::new(),
            allow_override: false,
        }
    }

    fn context_with(contract: OutputContract, output: StepOutput) -> Context {
        Context {
            tool: "fetch_record".to_string(),
            params: serde_json::Map::new(),
            result: Some(output),
            expected_output: Some(contract),
            step_id: StepId::new("s1"),
            session_id: None,
            state: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn kind_mismatch_warns_by_default() {
        let validator = OutputContractValidator::new();
        let contract = OutputContract { expected_kind: StepOutputKind::Json, schema: None, strict: false };
        let ctx = context_with(contract, StepOutput::text("not json"));
        let decisions = validator.evaluate(&ctx, &base_config()).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].outcome, DecisionOutcome::Warn);
        assert_eq!(decisions[0].code, fc_core::codes::OUTPUT_CONTRACT_TYPE_MISMATCH);
    }

    #[test]
    fn strict_contract_blocks_on_mismatch() {
        let validator = OutputContractValidator::new();
        let contract = OutputContract { expected_kind: StepOutputKind::Json, schema: None, strict: true };
        let ctx = context_with(contract, StepOutput::text("not json"));
        let decisions = validator.evaluate(&ctx, &base_config()).unwrap();
        assert_eq!(decisions[0].outcome, DecisionOutcome::Block);
    }

    #[test]
    fn missing_required_field_is_named() {
        let validator = OutputContractValidator::new();
        let schema = json!({"type": "object", "required": ["id", "name"]});
        let contract = OutputContract { expected_kind: StepOutputKind::Json, schema: Some(schema), strict: false };
        let ctx = context_with(contract, StepOutput::json(json!({"id": 1})));
        let decisions = validator.evaluate(&ctx, &base_config()).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].code, fc_core::codes::OUTPUT_CONTRACT_MISSING_FIELDS);
        assert_eq!(decisions[0].evidence.get("missing_required_fields"), Some(&json!(["name"])));
    }

    #[test]
    fn matching_output_produces_no_decision() {
        let validator = OutputContractValidator::new();
        let schema = json!({"type": "object", "required": ["id"]});
        let contract = OutputContract { expected_kind: StepOutputKind::Json, schema: Some(schema), strict: false };
        let ctx = context_with(contract, StepOutput::json(json!({"id": 1})));
        let decisions = validator.evaluate(&ctx, &base_config()).unwrap();
        assert!(decisions.is_empty());
    }
}
