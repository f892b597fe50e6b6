// fc-validate/src/builtin/file_size.rs
// ============================================================================
// Module: File Size Validator
// Description: Rejects operations on files that exceed a configured limit.
// Purpose: Bound resource consumption for file-reading tools.
// Dependencies: fc-core, fc-validate::validator
// ============================================================================

//! ## Overview
//! Only existing, regular files are checked: a path that does not yet
//! exist (the common case for a write target) or names a directory is
//! silently allowed through — this validator is about bounding reads of
//! data already on disk, not about predicting a write's eventual size.

use std::collections::BTreeMap;
use std::path::Path;

use fc_core::Context;
use fc_core::Decision;
use fc_core::ValidatorConfig;
use serde_json::Value;
use serde_json::json;

use crate::validator::BaseValidator;
use crate::validator::ValidatorError;

/// Validator id.
pub const ID: &str = "resource_file_size";

/// Default maximum file size, 100 MiB.
const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Rejects a call whose path parameter names an existing regular file
/// larger than `max_bytes`.
#[derive(Debug, Default)]
pub struct FileSizeValidator;

impl FileSizeValidator {
    /// Creates a new validator instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BaseValidator for FileSizeValidator {
    fn id(&self) -> &str {
        ID
    }

    fn domain(&self) -> &str {
        "resource"
    }

    fn config_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "path_params": { "type": "array", "items": { "type": "string" } },
                "max_bytes": { "type": "integer" },
            },
        }))
    }

    fn default_config(&self) -> BTreeMap<String, Value> {
        let mut config = BTreeMap::new();
        config.insert("path_params".to_string(), json!(["path", "file_path"]));
        config.insert("max_bytes".to_string(), json!(DEFAULT_MAX_BYTES));
        config
    }

    fn evaluate(&self, context: &Context, config: &ValidatorConfig) -> Result<Vec<Decision>, ValidatorError> {
        let effective = self.effective_config(config);
        let path_params: Vec<String> = effective
            .get("path_params")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(|entry| entry.as_str().map(str::to_string)).collect())
            .unwrap_or_else(|| vec!["path".to_string(), "file_path".to_string()]);
        let max_bytes = effective.get("max_bytes").and_then(Value::as_u64).unwrap_or(DEFAULT_MAX_BYTES);

        let Some((field, raw_value)) =
            path_params.iter().find_map(|name| context.params.get(name).map(|value| (name.clone(), value)))
        else {
            return Ok(Vec::new());
        };

        let Some(path_str) = raw_value.as_str() else {
            let mut decision =
                Decision::block(fc_core::codes::RES_FILE_SIZE_PARAM_TYPE, ID, format!("Parameter '{field}' must be a string path"));
            decision.evidence.insert("field".to_string(), json!(field));
            decision.tool = Some(context.tool.clone());
            decision.step_id = Some(context.step_id.clone());
            return Ok(vec![decision]);
        };

        let path = Path::new(path_str);
        let Ok(metadata) = path.metadata() else {
            return Ok(Vec::new());
        };
        if !metadata.is_file() {
            return Ok(Vec::new());
        }
        let size = metadata.len();
        if size <= max_bytes {
            return Ok(Vec::new());
        }

        let mut decision = Decision::block(
            fc_core::codes::RES_FILE_SIZE_EXCEEDED,
            ID,
            format!("File '{path_str}' is {size} bytes, exceeding the {max_bytes} byte limit"),
        );
        decision.evidence.insert("path".to_string(), json!(path_str));
        decision.evidence.insert("size".to_string(), json!(size));
        decision.evidence.insert("max_bytes".to_string(), json!(max_bytes));
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
    use std::io::Write;

    use fc_core::DecisionOutcome;
    use fc_core::StepId;
    use tempfile::NamedTempFile;

    use super::*;

    fn config(max_bytes: u64) -> ValidatorConfig {
        let mut config = BTreeMap::new();
        config.insert("max_bytes".to_string(), json!(max_bytes));
        ValidatorConfig {
            enabled: true,
            enforcement: fc_core::EnforcementMode::Block,
            domain: "resource".to_string(),
            priority: 0,
            config,
            exceptions: Vec::new(),
            allow_override: false,
        }
    }

    fn context_with_path(path: &str) -> Context {
        let mut params = serde_json::Map::new();
        params.insert("path".to_string(), json!(path));
        Context {
            tool: "read_file".to_string(),
            params,
            result: None,
            expected_output: None,
            step_id: StepId::new("s1"),
            session_id: None,
            state: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn oversized_file_blocks() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; 1024]).unwrap();
        let validator = FileSizeValidator::new();
        let ctx = context_with_path(file.path().to_str().unwrap());
        let decisions = validator.evaluate(&ctx, &config(100)).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].outcome, DecisionOutcome::Block);
        assert_eq!(decisions[0].code, fc_core::codes::RES_FILE_SIZE_EXCEEDED);
    }

    #[test]
    fn within_limit_allows() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; 10]).unwrap();
        let validator = FileSizeValidator::new();
        let ctx = context_with_path(file.path().to_str().unwrap());
        let decisions = validator.evaluate(&ctx, &config(1024)).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn nonexistent_file_is_skipped() {
        let validator = FileSizeValidator::new();
        let ctx = context_with_path("/no/such/file/at/all");
        let decisions = validator.evaluate(&ctx, &config(10)).unwrap();
        assert!(decisions.is_empty());
    }
}
