// fc-semantic/src/parsers/sql.rs
// ============================================================================
// Module: SQL Parser
// Description: Keyword-scanning structural view of a SQL-shaped string.
// Purpose: Give rules injection-relevant signal without a full SQL grammar.
// Dependencies: regex
// ============================================================================

//! ## Overview
//! This is a token scan, not a parser: it looks for a fixed set of
//! dangerous keywords as whole words, stacked statements (more than one
//! `;`), comment markers (`--`, `/*`, `#`), and `UNION ... SELECT` shape.
//! None of this proves an injection; it is the same structural signal
//! [`crate::rule::SemanticRule`] implementations reason about alongside
//! other evidence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use regex::Regex;
use regex::RegexBuilder;

/// Keywords whose presence as a whole word is injection-relevant.
const DANGEROUS_KEYWORDS: &[&str] =
    &["union", "select", "insert", "update", "delete", "drop", "alter", "create", "exec", "execute", "xp_", "sp_"];

/// Structured view of one SQL-shaped string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SqlAnalysis {
    /// Dangerous keywords found, in [`DANGEROUS_KEYWORDS`] order.
    pub keywords: Vec<String>,
    /// Whether a comment marker (`--`, `/*`, `*/`, `#`) is present.
    pub has_comments: bool,
    /// Whether more than one `;`-separated statement is present.
    pub has_stacked: bool,
    /// Whether both `union` and `select` appear (case-insensitive).
    pub has_union: bool,
    /// `keywords.len()`, kept as a field for rule convenience.
    pub keyword_count: usize,
}

/// Scans `query` for dangerous keywords and structural injection signal.
#[must_use]
pub fn extract_keywords(query: &str) -> SqlAnalysis {
    let lower = query.to_lowercase();

    let keywords: Vec<String> = DANGEROUS_KEYWORDS.iter().filter(|keyword| keyword_present(&lower, keyword)).map(|keyword| (*keyword).to_string()).collect();

    let has_comments = query.contains("--") || query.contains("/*") || query.contains("*/") || query.contains('#');
    let has_stacked = query.matches(';').count() > 1;
    let has_union = lower.contains("union") && lower.contains("select");

    SqlAnalysis { keyword_count: keywords.len(), keywords, has_comments, has_stacked, has_union }
}

fn keyword_present(lower_query: &str, keyword: &str) -> bool {
    word_boundary_regex(keyword).is_some_and(|pattern| pattern.is_match(lower_query))
}

/// Builds a `\b<keyword>\b` matcher. Returns `None` on build failure
/// instead of panicking; an escaped literal keyword never actually fails
/// to compile, but treating it as "no match" keeps this function total.
fn word_boundary_regex(keyword: &str) -> Option<Regex> {
    let escaped = regex::escape(keyword);
    RegexBuilder::new(&format!(r"\b{escaped}\b")).build().ok()
}

/// Heuristic combining [`SqlAnalysis`] fields into a single likelihood
/// verdict: two or more dangerous keywords, stacked statements paired with
/// a comment marker, or a `UNION ... SELECT` shape.
#[must_use]
pub fn is_injection_likely(analysis: &SqlAnalysis) -> bool {
    analysis.keyword_count >= 2 || (analysis.has_stacked && analysis.has_comments) || analysis.has_union
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
    fn plain_query_has_no_signal() {
        let analysis = extract_keywords("SELECT id FROM users WHERE id = ?");
        assert_eq!(analysis.keyword_count, 1);
        assert!(!is_injection_likely(&analysis));
    }

    #[test]
    fn union_select_is_flagged() {
        let analysis = extract_keywords("' UNION SELECT password FROM users--");
        assert!(analysis.has_union);
        assert!(analysis.has_comments);
        assert!(is_injection_likely(&analysis));
    }

    #[test]
    fn stacked_statement_with_comment_is_flagged() {
        let analysis = extract_keywords("1; DROP TABLE users; --");
        assert!(analysis.has_stacked);
        assert!(analysis.has_comments);
        assert!(is_injection_likely(&analysis));
    }

    #[test]
    fn keyword_matching_is_whole_word() {
        let analysis = extract_keywords("selection_criteria = 'select_me'");
        assert_eq!(analysis.keyword_count, 0);
    }
}
