// fc-validate/src/builtin/required_fields.rs
// ============================================================================
// Module: Required Fields Validator
// Description: Rejects calls missing a configured set of parameter names.
// Purpose: Cheap, deterministic structural gate ahead of any domain logic.
// Dependencies: fc-core, fc-validate::validator
// ============================================================================

//! ## Overview
//! `type_required_fields` has no notion of value shape, only presence. It
//! exists so a policy author can require e.g. `reason` on a destructive
//! tool call without writing a bespoke validator.

use std::collections::BTreeMap;

use fc_core::Context;
use fc_core::Decision;
use fc_core::ValidatorConfig;
use serde_json::Value;
use serde_json::json;

use crate::validator::BaseValidator;
use crate::validator::ValidatorError;

/// Validator id.
pub const ID: &str = "type_required_fields";

/// Fails when any configured field is absent from `params`.
#[derive(Debug, Default)]
pub struct RequiredFieldsValidator;

impl RequiredFieldsValidator {
    /// Creates a new validator instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BaseValidator for RequiredFieldsValidator {
    fn id(&self) -> &str {
        ID
    }

    fn domain(&self) -> &str {
        "type"
    }

    fn config_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "required_fields": { "type": "array", "items": { "type": "string" } },
            },
        }))
    }

    fn default_config(&self) -> BTreeMap<String, Value> {
        let mut config = BTreeMap::new();
        config.insert("required_fields".to_string(), json!([]));
        config
    }

    fn evaluate(&self, context: &Context, config: &ValidatorConfig) -> Result<Vec<Decision>, ValidatorError> {
        let effective = self.effective_config(config);
        let required: Vec<String> = effective
            .get("required_fields")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(|entry| entry.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let missing: Vec<String> = required.into_iter().filter(|field| !context.params.contains_key(field)).collect();
        if missing.is_empty() {
            return Ok(Vec::new());
        }

        let mut decision = Decision::block(
            fc_core::codes::TYPE_REQUIRED_FIELD_MISSING,
            ID,
            format!("Missing required field(s): {}", missing.join(", ")),
        );
        decision.evidence.insert("missing_fields".to_string(), json!(missing));
        decision.tool = Some(context.tool.clone());
        decision.step_id = Some(context.step_id.clone());
        Ok(vec![decision])
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use fc_core::DecisionOutcome;
    use fc_core::StepId;

    use super::*;

    fn config(fields: &[&str]) -> ValidatorConfig {
        let mut config = BTreeMap::new();
        config.insert("required_fields".to_string(), json!(fields));
        ValidatorConfig {
            enabled: true,
            enforcement: fc_core::EnforcementMode::Block,
            domain: "type".to_string(),
            priority: 0,
            config,
            exceptions: Vec::new(),
            allow_override: false,
        }
    }

    fn context(params: Value) -> Context {
        let Value::Object(map) = params else { unreachable!("test fixture must be an object") };
        Context {
            tool: "delete_record".to_string(),
            params: map,
            result: None,
            expected_output: None,
            step_id: StepId::new("s1"),
            session_id: None,
            state: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn missing_field_blocks() {
        let validator = RequiredFieldsValidator::new();
        let ctx = context(json!({"id": 1}));
        let decisions = validator.evaluate(&ctx, &config(&["reason"])).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].outcome, DecisionOutcome::Block);
    }

    #[test]
    fn present_fields_allow() {
        let validator = RequiredFieldsValidator::new();
        let ctx = context(json!({"id": 1, "reason": "cleanup"}));
        let decisions = validator.evaluate(&ctx, &config(&["reason"])).unwrap();
        assert!(decisions.is_empty());
    }
}
