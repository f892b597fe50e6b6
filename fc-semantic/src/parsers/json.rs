// fc-semantic/src/parsers/json.rs
// ============================================================================
// Module: JSON Payload Parser
// Description: Extracts every string value's JSON path for scanning.
// Purpose: Let rules inspect nested string payloads without re-walking JSON.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Structured tool parameters sometimes carry a JSON-encoded payload as a
//! string (a webhook body, a templated request). This flattens that
//! payload into `(json_path, string_value)` pairs so rules can scan every
//! string leaf the same way they'd scan a top-level parameter.

use serde_json::Value;

/// Flattened view of one JSON-shaped string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JsonAnalysis {
    /// Whether the string parsed as JSON at all.
    pub valid: bool,
    /// Every string leaf found, paired with its JSON path (`a.b[0].c`).
    pub string_paths: Vec<(String, String)>,
}

/// Parses `payload` as JSON and flattens its string leaves.
#[must_use]
pub fn parse_json(payload: &str) -> JsonAnalysis {
    let Ok(value) = serde_json::from_str::<Value>(payload) else {
        return JsonAnalysis { valid: false, string_paths: Vec::new() };
    };
    let mut string_paths = Vec::new();
    collect_string_paths(&value, String::new(), &mut string_paths);
    JsonAnalysis { valid: true, string_paths }
}

fn collect_string_paths(value: &Value, path: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                collect_string_paths(child, child_path, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                collect_string_paths(child, format!("{path}[{index}]"), out);
            }
        }
        Value::String(text) => out.push((path, text.clone())),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
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
    use super::*;

    #[test]
    fn flattens_nested_strings_with_paths() {
        let analysis = parse_json(r#"{"user": {"name": "alice", "tags": ["a", "b"]}}"#);
        assert!(analysis.valid);
        assert!(analysis.string_paths.contains(&("user.name".to_string(), "alice".to_string())));
        assert!(analysis.string_paths.contains(&("user.tags[0]".to_string(), "a".to_string())));
        assert!(analysis.string_paths.contains(&("user.tags[1]".to_string(), "b".to_string())));
    }

    #[test]
    fn invalid_json_is_marked_invalid() {
        let analysis = parse_json("not json");
        assert!(!analysis.valid);
        assert!(analysis.string_paths.is_empty());
    }
}
