// fc-semantic/src/verdict.rs
// ============================================================================
// Module: Semantic Verdict
// Description: The structured result one guard evaluation produces.
// Purpose: Let the Pipeline turn a guard run into a single POLICY_DENIED decision.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! A single call can trip more than one rule; the guard still reports one
//! [`SemanticVerdict`] per call, naming the highest-severity rule as the
//! headline `rule_id` and listing every [`RuleFinding`] that met the
//! configured minimum severity. This is the shape the Pipeline's Semantic
//! Guard stage converts into a blocking outcome with
//! `policy_id = "Semantic-Guard"`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use fc_core::RiskLevel;
use serde_json::Value;

/// Source tag every [`SemanticVerdict`] carries.
pub const SOURCE: &str = "semantic";

/// One rule's finding against a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleFinding {
    /// Id of the rule that produced this finding.
    pub rule_id: String,
    /// Severity of the underlying issue.
    pub severity: RiskLevel,
    /// Human-readable description of what was found.
    pub message: String,
    /// Structured evidence supporting the finding.
    pub evidence: BTreeMap<String, Value>,
}

/// The structured result of one guard evaluation with at least one
/// finding remaining after the minimum-severity filter.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticVerdict {
    /// Id of the highest-severity rule that fired.
    pub rule_id: String,
    /// Every finding that met the configured minimum severity, in rule
    /// evaluation order.
    pub violations: Vec<RuleFinding>,
    /// Evidence merged from every finding, namespaced by rule id.
    pub evidence: BTreeMap<String, Value>,
    /// Human-readable summary of all findings, newline-joined.
    pub explanation: String,
    /// Always `"semantic"` ([`SOURCE`]); kept as a field so downstream
    /// serialization doesn't need a constant reference.
    pub source: String,
}

impl SemanticVerdict {
    /// Builds a verdict from a non-empty set of findings, selecting the
    /// highest-severity rule as the headline.
    ///
    /// # Panics
    ///
    /// Never panics externally visibly, but is only meaningful when
    /// `findings` is non-empty; callers pass an empty slice only in tests
    /// exercising the degenerate case, where `rule_id` is empty.
    #[must_use]
    pub fn from_findings(findings: Vec<RuleFinding>) -> Self {
        let headline = findings.iter().max_by_key(|finding| finding.severity).map(|finding| finding.rule_id.clone()).unwrap_or_default();

        let mut evidence = BTreeMap::new();
        let mut explanation_lines = Vec::with_capacity(findings.len());
        for finding in &findings {
            for (key, value) in &finding.evidence {
                evidence.insert(format!("{}.{key}", finding.rule_id), value.clone());
            }
            explanation_lines.push(format!("[{}] {}", finding.rule_id, finding.message));
        }

        Self { rule_id: headline, violations: findings, evidence, explanation: explanation_lines.join("\n"), source: SOURCE.to_string() }
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

    fn finding(rule_id: &str, severity: RiskLevel) -> RuleFinding {
        RuleFinding { rule_id: rule_id.to_string(), severity, message: format!("{rule_id} fired"), evidence: BTreeMap::new() }
    }

    #[test]
    fn headline_is_highest_severity_rule() {
        let verdict = SemanticVerdict::from_findings(vec![finding("a", RiskLevel::Medium), finding("b", RiskLevel::Critical)]);
        assert_eq!(verdict.rule_id, "b");
        assert_eq!(verdict.violations.len(), 2);
        assert_eq!(verdict.source, SOURCE);
    }

    #[test]
    fn explanation_joins_every_finding() {
        let verdict = SemanticVerdict::from_findings(vec![finding("a", RiskLevel::High)]);
        assert!(verdict.explanation.contains("[a] a fired"));
    }
}
