// fc-validate/src/explain.rs
// ============================================================================
// Module: Decision Explanation
// Description: Aggregates an engine run's decisions into a human summary.
// Purpose: Give operators a concise and a verbose view of one evaluation.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! [`DecisionExplanation`] is built from the full ordered decision list an
//! evaluation produced (before dedup annotations are stripped — it reads
//! `suppressed_by` to skip decisions that were folded into a primary). It
//! reports the effective enforcement mode for the run (break-glass active
//! forces `Block` regardless of per-validator settings) and renders both a
//! concise top-3 summary and the full evidence listing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use fc_core::Decision;
use fc_core::DecisionOutcome;
use fc_core::RiskLevel;

// ============================================================================
// SECTION: Explanation
// ============================================================================

/// Aggregated view over one evaluation's decisions.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionExplanation {
    /// Count of decisions per outcome.
    pub by_outcome: BTreeMap<DecisionOutcome, usize>,
    /// Count of decisions per validator id.
    pub by_validator: BTreeMap<String, usize>,
    /// Count of decisions per risk level.
    pub by_risk: BTreeMap<RiskLevel, usize>,
    /// Count of decisions per code.
    pub by_code: BTreeMap<String, usize>,
    /// Whether break-glass override was active for this evaluation.
    pub break_glass_active: bool,
    /// Effective mode: `Block` whenever any non-suppressed decision blocks,
    /// forced to `Block` when break-glass is active (break-glass only ever
    /// loosens outcomes that were already evaluated, never the summary's
    /// headline severity).
    pub effective_mode: DecisionOutcome,
    /// Top 3 blocking decisions' messages, most severe first.
    pub concise_summary: Vec<String>,
    /// Full evidence for every non-suppressed decision.
    pub verbose_summary: Vec<DecisionEvidence>,
}

/// One decision's full evidence, as surfaced in the verbose explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionEvidence {
    /// Decision code.
    pub code: String,
    /// Validator id that produced it.
    pub validator_id: String,
    /// Outcome after enforcement/override/dedup.
    pub outcome: DecisionOutcome,
    /// Human-readable message.
    pub message: String,
    /// Structured evidence fields.
    pub evidence: BTreeMap<String, serde_json::Value>,
}

/// Builds a [`DecisionExplanation`] from an evaluation's ordered decisions.
#[must_use]
pub fn explain(decisions: &[Decision], break_glass_active: bool) -> DecisionExplanation {
    let visible: Vec<&Decision> = decisions.iter().filter(|decision| decision.suppressed_by.is_none()).collect();

    let mut by_outcome = BTreeMap::new();
    let mut by_validator = BTreeMap::new();
    let mut by_risk = BTreeMap::new();
    let mut by_code = BTreeMap::new();
    for decision in &visible {
        *by_outcome.entry(decision.outcome).or_insert(0) += 1;
        *by_validator.entry(decision.validator_id.clone()).or_insert(0) += 1;
        *by_risk.entry(decision.risk_level).or_insert(0) += 1;
        *by_code.entry(decision.code.clone()).or_insert(0) += 1;
    }

    let any_blocking = visible.iter().any(|decision| decision.outcome == DecisionOutcome::Block);
    let effective_mode =
        if break_glass_active || any_blocking { DecisionOutcome::Block } else { DecisionOutcome::Allow };

    let mut blocking: Vec<&&Decision> = visible.iter().filter(|decision| decision.outcome == DecisionOutcome::Block).collect();
    blocking.sort_by(|a, b| b.risk_level.cmp(&a.risk_level));
    let concise_summary =
        blocking.iter().take(3).map(|decision| format!("[{}] {}: {}", decision.code, decision.validator_id, decision.message)).collect();

    let verbose_summary = visible
        .iter()
        .map(|decision| DecisionEvidence {
            code: decision.code.clone(),
            validator_id: decision.validator_id.clone(),
            outcome: decision.outcome,
            message: decision.message.clone(),
            evidence: decision.evidence.clone(),
        })
        .collect();

    DecisionExplanation { by_outcome, by_validator, by_risk, by_code, break_glass_active, effective_mode, concise_summary, verbose_summary }
}

impl DecisionExplanation {
    /// Serializes this explanation to a JSON object for programmatic
    /// consumers (trace evidence, HTTP responses).
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "by_outcome": self.by_outcome.iter().map(|(k, v)| (format!("{k:?}").to_lowercase(), *v)).collect::<BTreeMap<_, _>>(),
            "by_validator": self.by_validator,
            "by_risk": self.by_risk.iter().map(|(k, v)| (format!("{k:?}").to_lowercase(), *v)).collect::<BTreeMap<_, _>>(),
            "by_code": self.by_code,
            "break_glass_active": self.break_glass_active,
            "effective_mode": format!("{:?}", self.effective_mode).to_lowercase(),
            "concise_summary": self.concise_summary,
            "verbose_summary": self.verbose_summary.iter().map(|entry| serde_json::json!({
                "code": entry.code,
                "validator_id": entry.validator_id,
                "outcome": format!("{:?}", entry.outcome).to_lowercase(),
                "message": entry.message,
                "evidence": entry.evidence,
            })).collect::<Vec<_>>(),
        })
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
    fn concise_summary_caps_at_three_most_severe() {
        let decisions: Vec<Decision> = (0..5)
            .map(|index| {
                let mut decision = Decision::block(format!("FC_{index}"), "v", "msg");
                decision.risk_level = if index == 0 { RiskLevel::Critical } else { RiskLevel::Low };
                decision
            })
            .collect();
        let explanation = explain(&decisions, false);
        assert_eq!(explanation.concise_summary.len(), 3);
        assert!(explanation.concise_summary[0].contains("FC_0"));
    }

    #[test]
    fn suppressed_decisions_are_excluded() {
        let mut primary = Decision::block("FC_A", "v1", "primary");
        let mut suppressed = Decision::block("FC_A", "v2", "suppressed");
        suppressed.suppressed_by = Some("FC_A".to_string());
        primary.suppressed_by = None;
        let explanation = explain(&[primary, suppressed], false);
        assert_eq!(explanation.verbose_summary.len(), 1);
    }

    #[test]
    fn break_glass_forces_block_effective_mode() {
        let explanation = explain(&[], true);
        assert_eq!(explanation.effective_mode, DecisionOutcome::Block);
    }
}
