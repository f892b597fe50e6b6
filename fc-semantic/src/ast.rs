// fc-semantic/src/ast.rs
// ============================================================================
// Module: Call AST
// Description: Per-parameter structured parses built once per tool call.
// Purpose: Give every rule the same parsed view instead of re-parsing per rule.
// Dependencies: fc-core, crate::parsers
// ============================================================================

//! ## Overview
//! [`CallAst::build`] parses every string-valued parameter with every
//! applicable parser. A parameter that doesn't look like a URL still gets
//! a [`crate::parsers::url_parse::UrlAnalysis`] with `valid: false` —
//! rules decide what's relevant, the AST doesn't pre-filter.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde_json::Map;
use serde_json::Value;

use crate::parsers::json::JsonAnalysis;
use crate::parsers::json::parse_json;
use crate::parsers::path::PathAnalysis;
use crate::parsers::path::normalize as normalize_path;
use crate::parsers::shell::ShellTokens;
use crate::parsers::shell::tokenize as tokenize_shell;
use crate::parsers::sql::SqlAnalysis;
use crate::parsers::sql::extract_keywords;
use crate::parsers::url_parse::UrlAnalysis;
use crate::parsers::url_parse::parse as parse_url;

// ============================================================================
// SECTION: Per-Parameter AST
// ============================================================================

/// Every structured parse built for one string-valued parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamAst {
    /// Shell tokenization of the raw string.
    pub shell: ShellTokens,
    /// SQL keyword scan of the raw string.
    pub sql: SqlAnalysis,
    /// URL parse of the raw string.
    pub url: UrlAnalysis,
    /// Path normalization of the raw string.
    pub path: PathAnalysis,
    /// JSON payload flattening of the raw string.
    pub json: JsonAnalysis,
}

/// Structured view of one tool call, built from every string parameter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallAst {
    /// Tool name being called.
    pub tool: String,
    /// Per-parameter parses, keyed by parameter name.
    pub params: BTreeMap<String, ParamAst>,
}

impl CallAst {
    /// Builds a [`CallAst`] for `tool`/`params`, parsing every string value.
    #[must_use]
    pub fn build(tool: &str, params: &Map<String, Value>) -> Self {
        let mut parsed = BTreeMap::new();
        for (name, value) in params {
            if let Value::String(text) = value {
                parsed.insert(
                    name.clone(),
                    ParamAst {
                        shell: tokenize_shell(text),
                        sql: extract_keywords(text),
                        url: parse_url(text),
                        path: normalize_path(text),
                        json: parse_json(text),
                    },
                );
            }
        }
        Self { tool: tool.to_string(), params: parsed }
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
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_per_parameter_parses_for_string_values_only() {
        let Value::Object(params) = json!({"command": "rm -rf /", "count": 3}) else { unreachable!() };
        let ast = CallAst::build("run_shell", &params);
        assert_eq!(ast.tool, "run_shell");
        assert!(ast.params.contains_key("command"));
        assert!(!ast.params.contains_key("count"));
        assert_eq!(ast.params["command"].shell.program, "rm");
    }
}
