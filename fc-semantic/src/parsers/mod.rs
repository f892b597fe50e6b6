// fc-semantic/src/parsers/mod.rs
// ============================================================================
// Module: Semantic Parsers
// Description: Structured per-call views: shell, SQL, URL, path, JSON payload.
// Purpose: Give rules a typed AST instead of re-deriving structure from strings.
// Dependencies: none (submodules pull in regex/url/serde_json as needed)
// ============================================================================

//! ## Overview
//! Each submodule parses one shape of string parameter into a plain data
//! struct. None of them can fail in a way that stops evaluation: an
//! unparsable string becomes an "invalid"/best-effort analysis, never an
//! error, so [`crate::guard::SemanticGuard`] can build an AST over
//! whatever parameters a call happens to carry.

pub mod json;
pub mod path;
pub mod shell;
pub mod sql;
pub mod url_parse;
