// fc-validate/src/builtin/path_traversal.rs
// ============================================================================
// Module: Path Traversal Validator
// Description: Sandbox boundary enforcement for path-shaped parameters.
// Purpose: Reject traversal, Windows path families, and symlink escapes.
// Dependencies: fc-core, fc-validate::validator
// ============================================================================

//! ## Overview
//! Checks run in a fixed order so the first violated invariant always wins:
//! trailing dot/space manipulation, NT device prefixes, device namespaces,
//! alternate data streams, mixed separators, UNC paths, then symlink/
//! junction-aware resolution against the sandbox root. The sandbox root is
//! resolved with priority context metadata > context state > validator
//! config > current working directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::path::Path;
use std::path::PathBuf;

use fc_core::Context;
use fc_core::Decision;
use fc_core::ValidatorConfig;
use fc_core::meta_keys;
use serde_json::Value;
use serde_json::json;

use crate::validator::BaseValidator;
use crate::validator::ValidatorError;

/// Validator id.
pub const ID: &str = "security_path_traversal";

/// Sandbox boundary enforcement for path-shaped tool parameters.
#[derive(Debug, Default)]
pub struct PathTraversalValidator;

impl PathTraversalValidator {
    /// Creates a new validator instance.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BaseValidator for PathTraversalValidator {
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
                "path_params": { "type": "array", "items": { "type": "string" } },
                "sandbox_root": { "type": "string" },
            },
        }))
    }

    fn default_config(&self) -> BTreeMap<String, Value> {
        let mut config = BTreeMap::new();
        config.insert(
            "path_params".to_string(),
            json!(["path", "file_path", "relative_path"]),
        );
        config.insert("sandbox_root".to_string(), Value::Null);
        config
    }

    fn evaluate(&self, context: &Context, config: &ValidatorConfig) -> Result<Vec<Decision>, ValidatorError> {
        let effective = self.effective_config(config);
        let path_params: Vec<String> = effective
            .get("path_params")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(|entry| entry.as_str().map(str::to_string)).collect())
            .unwrap_or_else(|| vec!["path".to_string(), "file_path".to_string(), "relative_path".to_string()]);
        let config_sandbox_root = effective.get("sandbox_root").and_then(Value::as_str).map(str::to_string);

        let Some((field, path_value)) =
            path_params.iter().find_map(|name| context.params.get(name).map(|value| (name.clone(), value)))
        else {
            return Ok(Vec::new());
        };

        let path_str = value_to_path_string(path_value);
        let (sandbox_root, sandbox_root_source) = resolve_sandbox_root(context, config_sandbox_root.as_deref());

        Ok(evaluate_path(context, &field, &path_str, &sandbox_root, sandbox_root_source))
    }
}

/// Converts a JSON param value to its string form for path-pattern checks.
fn value_to_path_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Sandbox Root Resolution
// ============================================================================

fn resolve_sandbox_root(context: &Context, config_sandbox_root: Option<&str>) -> (PathBuf, &'static str) {
    if let Some(value) = context.metadata.get(meta_keys::SANDBOX_ROOT).and_then(Value::as_str) {
        return (canonicalize_best_effort(Path::new(value)), "context:metadata.failcore.sys.sandbox_root");
    }
    if let Some(value) = context.metadata.get("sandbox_root").and_then(Value::as_str) {
        return (canonicalize_best_effort(Path::new(value)), "context:metadata.sandbox_root");
    }
    if let Some(value) = context.metadata.get("sandbox").and_then(Value::as_str) {
        return (canonicalize_best_effort(Path::new(value)), "context:metadata.sandbox");
    }
    if let Some(value) = context.state.get("sandbox_root").and_then(Value::as_str) {
        return (canonicalize_best_effort(Path::new(value)), "context:state.sandbox_root");
    }
    if let Some(value) = context.state.get("sandbox").and_then(Value::as_str) {
        return (canonicalize_best_effort(Path::new(value)), "context:state.sandbox");
    }
    if let Some(value) = config_sandbox_root {
        return (canonicalize_best_effort(Path::new(value)), "config");
    }
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    (canonicalize_best_effort(&cwd), "cwd_fallback")
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

// ============================================================================
// SECTION: Check Pipeline
// ============================================================================

#[allow(clippy::too_many_lines, reason = "Mirrors one linear check sequence; splitting would obscure ordering.")]
fn evaluate_path(
    context: &Context,
    field: &str,
    path_value: &str,
    sandbox_root: &Path,
    sandbox_root_source: &'static str,
) -> Vec<Decision> {
    let base_evidence = |extra: Vec<(&str, Value)>| -> BTreeMap<String, Value> {
        let mut evidence = BTreeMap::new();
        evidence.insert("path".to_string(), json!(path_value));
        evidence.insert("field".to_string(), json!(field));
        evidence.insert("sandbox_root".to_string(), json!(sandbox_root.display().to_string()));
        evidence.insert("sandbox_root_source".to_string(), json!(sandbox_root_source));
        for (key, value) in extra {
            evidence.insert(key.to_string(), value);
        }
        evidence
    };

    let block = |code: &str, message: String, evidence: BTreeMap<String, Value>| -> Decision {
        let mut decision = Decision::block(code.to_string(), ID, message);
        decision.evidence = evidence;
        decision.tool = Some(context.tool.clone());
        decision.step_id = Some(context.step_id.clone());
        decision
    };

    // Trailing dots/spaces, checked before any normalization.
    let trimmed_end = path_value.trim_end_matches(['.', ' ']);
    if trimmed_end != path_value {
        return vec![block(
            fc_core::codes::SEC_PATH_TRAILING_MANIPULATION,
            format!("Path with trailing dots/spaces not allowed: '{path_value}'"),
            base_evidence(vec![("reason", json!("trailing_manipulation")), ("normalized", json!(trimmed_end))]),
        )];
    }
    let path_value = path_value.trim();

    // NT device-namespace prefixes.
    if path_value.starts_with(r"\\?\") || path_value.starts_with(r"\\.\") {
        return vec![block(
            fc_core::codes::SEC_PATH_NT_PREFIX,
            format!("NT path prefix not allowed: '{path_value}'"),
            base_evidence(vec![("reason", json!("nt_path_prefix"))]),
        )];
    }

    // Device namespaces (GLOBALROOT, Device\).
    let upper = path_value.to_uppercase();
    if upper.contains("GLOBALROOT") || upper.contains(r"DEVICE\") {
        return vec![block(
            fc_core::codes::SEC_PATH_DEVICE,
            format!("Device path not allowed: '{path_value}'"),
            base_evidence(vec![("reason", json!("device_path"))]),
        )];
    }

    // Alternate data streams: extra ':' beyond a drive-letter prefix.
    let colon_count = path_value.matches(':').count();
    let has_drive_prefix = path_value.as_bytes().get(1) == Some(&b':');
    if colon_count > 1 || (colon_count == 1 && !has_drive_prefix) {
        return vec![block(
            fc_core::codes::SEC_PATH_ADS,
            format!("Alternate Data Stream not allowed: '{path_value}'"),
            base_evidence(vec![("reason", json!("alternate_data_stream"))]),
        )];
    }

    // Mixed separators.
    if path_value.contains('\\') && path_value.contains('/') {
        return vec![block(
            fc_core::codes::SEC_PATH_MIXED_SEPARATORS,
            format!("Mixed path separators not allowed: '{path_value}'"),
            base_evidence(vec![("reason", json!("mixed_separators"))]),
        )];
    }

    // UNC paths.
    if path_value.starts_with(r"\\") || path_value.starts_with("//") {
        return vec![block(
            fc_core::codes::SEC_PATH_UNC,
            format!("UNC paths are not allowed: '{path_value}'"),
            base_evidence(vec![("reason", json!("unc_path"))]),
        )];
    }

    let target = Path::new(path_value);
    let full_path = if target.is_absolute() { target.to_path_buf() } else { sandbox_root.join(target) };

    let resolved = match resolve_existing_or_ancestor(&full_path, sandbox_root, path_value) {
        Ok(path) => path,
        Err(decision_evidence) => {
            return vec![block(&decision_evidence.code, decision_evidence.message, decision_evidence.evidence)];
        }
    };

    if resolved.starts_with(sandbox_root) {
        return Vec::new();
    }

    let is_traversal_attempt = path_value.contains("..");
    let code =
        if is_traversal_attempt { fc_core::codes::SEC_PATH_TRAVERSAL } else { fc_core::codes::SEC_SANDBOX_VIOLATION };
    let message = if is_traversal_attempt {
        format!("Path traversal detected: '{path_value}' attempts to escape sandbox")
    } else {
        format!("Path is outside sandbox boundary: '{path_value}'")
    };
    vec![block(
        code,
        message,
        base_evidence(vec![
            ("resolved", json!(resolved.display().to_string())),
            ("reason", json!(if is_traversal_attempt { "traversal" } else { "outside_sandbox" })),
        ]),
    )]
}

/// A decision-shaped escape detected mid-resolution, before the final
/// boundary comparison.
struct EscapeDecision {
    code: String,
    message: String,
    evidence: BTreeMap<String, Value>,
}

/// Resolves `full_path` against the filesystem, following existing
/// symlinks/junctions, and returns the real path that would ultimately be
/// accessed. If no part of the path exists, returns `full_path` unchanged
/// (pure traversal/boundary analysis, the common case for writes).
fn resolve_existing_or_ancestor(full_path: &Path, sandbox_root: &Path, path_value: &str) -> Result<PathBuf, EscapeDecision> {
    if full_path.exists() {
        let resolved = full_path.canonicalize().unwrap_or_else(|_| full_path.to_path_buf());
        if !resolved.starts_with(sandbox_root) {
            let escape_point = first_ancestor_outside(&resolved, sandbox_root);
            return Err(EscapeDecision {
                code: fc_core::codes::SEC_SANDBOX_VIOLATION.to_string(),
                message: format!("Path escapes sandbox via symlink/junction: '{path_value}'"),
                evidence: escape_evidence(path_value, sandbox_root, &resolved, "symlink_escape", Some(&escape_point)),
            });
        }
        return Ok(resolved);
    }

    let mut ancestor = full_path.parent().unwrap_or(full_path).to_path_buf();
    while !ancestor.exists() {
        let Some(parent) = ancestor.parent() else {
            return Ok(full_path.to_path_buf());
        };
        if parent == ancestor {
            return Ok(full_path.to_path_buf());
        }
        ancestor = parent.to_path_buf();
    }
    let resolved_ancestor = ancestor.canonicalize().unwrap_or(ancestor.clone());
    if !resolved_ancestor.starts_with(sandbox_root) {
        let is_traversal = path_value.contains("..");
        let code =
            if is_traversal { fc_core::codes::SEC_PATH_TRAVERSAL } else { fc_core::codes::SEC_SANDBOX_VIOLATION };
        return Err(EscapeDecision {
            code: code.to_string(),
            message: if is_traversal {
                format!("Path traversal detected: '{path_value}' attempts to escape sandbox using '../'")
            } else {
                format!("Ancestor directory is outside sandbox: '{path_value}'")
            },
            evidence: escape_evidence(path_value, sandbox_root, &resolved_ancestor, "ancestor_outside_sandbox", None),
        });
    }
    let remainder = full_path.strip_prefix(&ancestor).unwrap_or(full_path);
    Ok(resolved_ancestor.join(remainder))
}

fn first_ancestor_outside(resolved: &Path, sandbox_root: &Path) -> PathBuf {
    let mut current = resolved.to_path_buf();
    while let Some(parent) = current.parent() {
        if parent == sandbox_root || parent.starts_with(sandbox_root) {
            return current;
        }
        current = parent.to_path_buf();
    }
    current
}

fn escape_evidence(
    path_value: &str,
    sandbox_root: &Path,
    resolved: &Path,
    reason: &str,
    escape_point: Option<&Path>,
) -> BTreeMap<String, Value> {
    let mut evidence = BTreeMap::new();
    evidence.insert("path".to_string(), json!(path_value));
    evidence.insert("sandbox_root".to_string(), json!(sandbox_root.display().to_string()));
    evidence.insert("resolved".to_string(), json!(resolved.display().to_string()));
    evidence.insert("reason".to_string(), json!(reason));
    if let Some(point) = escape_point {
        evidence.insert("escape_point".to_string(), json!(point.display().to_string()));
    }
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
    use fc_core::DecisionOutcome;
    use fc_core::StepId;
    use tempfile::TempDir;

    use super::*;

    fn context_with_path(path: &str) -> Context {
        let mut params = serde_json::Map::new();
        params.insert("path".to_string(), json!(path));
        Context {
            tool: "write_file".to_string(),
            params,
            result: None,
            expected_output: None,
            step_id: StepId::new("s1"),
            session_id: None,
            state: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn config_with_sandbox(sandbox: &Path) -> ValidatorConfig {
        let mut config = BTreeMap::new();
        config.insert("sandbox_root".to_string(), json!(sandbox.display().to_string()));
        ValidatorConfig {
            enabled: true,
            enforcement: fc_core::EnforcementMode::Block,
            domain: "security".to_string(),
            priority: 0,
            config,
            exceptions: Vec::new(),
            allow_override: false,
        }
    }

    #[test]
    fn traversal_outside_sandbox_is_blocked() {
        let dir = TempDir::new().unwrap();
        let validator = PathTraversalValidator::new();
        let context = context_with_path("../etc/passwd");
        let config = config_with_sandbox(dir.path());
        let decisions = validator.evaluate(&context, &config).unwrap();
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].outcome, DecisionOutcome::Block);
        assert_eq!(decisions[0].code, fc_core::codes::SEC_PATH_TRAVERSAL);
    }

    #[test]
    fn relative_path_inside_sandbox_is_allowed() {
        let dir = TempDir::new().unwrap();
        let validator = PathTraversalValidator::new();
        let context = context_with_path("notes/today.txt");
        let config = config_with_sandbox(dir.path());
        let decisions = validator.evaluate(&context, &config).unwrap();
        assert!(decisions.is_empty());
    }

    #[test]
    fn unc_path_is_blocked() {
        let dir = TempDir::new().unwrap();
        let validator = PathTraversalValidator::new();
        let context = context_with_path(r"\\server\share\file.txt");
        let config = config_with_sandbox(dir.path());
        let decisions = validator.evaluate(&context, &config).unwrap();
        assert_eq!(decisions[0].code, fc_core::codes::SEC_PATH_UNC);
    }

    #[test]
    fn trailing_dot_is_blocked() {
        let dir = TempDir::new().unwrap();
        let validator = PathTraversalValidator::new();
        let context = context_with_path("notes.txt.");
        let config = config_with_sandbox(dir.path());
        let decisions = validator.evaluate(&context, &config).unwrap();
        assert_eq!(decisions[0].code, fc_core::codes::SEC_PATH_TRAILING_MANIPULATION);
    }

    #[test]
    fn mixed_separators_are_blocked() {
        let dir = TempDir::new().unwrap();
        let validator = PathTraversalValidator::new();
        let context = context_with_path(r"foo/bar\baz.txt");
        let config = config_with_sandbox(dir.path());
        let decisions = validator.evaluate(&context, &config).unwrap();
        assert_eq!(decisions[0].code, fc_core::codes::SEC_PATH_MIXED_SEPARATORS);
    }

    #[test]
    fn missing_path_param_skips_validation() {
        let dir = TempDir::new().unwrap();
        let validator = PathTraversalValidator::new();
        let mut context = context_with_path("anything");
        context.params.clear();
        let config = config_with_sandbox(dir.path());
        let decisions = validator.evaluate(&context, &config).unwrap();
        assert!(decisions.is_empty());
    }
}
