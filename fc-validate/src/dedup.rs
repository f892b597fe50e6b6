// fc-validate/src/dedup.rs
// ============================================================================
// Module: Decision Deduplication
// Description: Collapses repeated decisions about the same underlying issue.
// Purpose: Stop one root cause from producing multiple blocking decisions.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! Decisions are grouped by `(tool, rule_id_or_code, risk_level,
//! key_evidence_fields)`. Within a group, the decision from the
//! highest-priority domain survives as primary; siblings are annotated
//! with `suppressed_by` pointing at the primary's code, and any `Block`
//! among the siblings is downgraded to `Allow` so the same root cause
//! never blocks twice.

// ============================================================================
// SECTION: Imports
// ============================================================================

use fc_core::Decision;
use fc_core::DecisionOutcome;

// ============================================================================
// SECTION: Domain Priority
// ============================================================================

/// Dedup primary-selection priority, descending: the domain with the
/// highest number wins when two decisions share a dedup key.
#[must_use]
pub fn dedup_domain_priority(domain: &str) -> i32 {
    match domain {
        "security" => 100,
        "dlp" => 80,
        "semantic" => 60,
        "taint_flow" => 40,
        "drift" => 20,
        "audit" => 10,
        _ => 0,
    }
}

// ============================================================================
// SECTION: Dedup Key
// ============================================================================

/// The grouping key decisions are collapsed by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DedupKey {
    tool: Option<String>,
    rule_or_code: String,
    risk_level: fc_core::RiskLevel,
    evidence_fingerprint: String,
}

fn dedup_key(decision: &Decision) -> DedupKey {
    DedupKey {
        tool: decision.tool.clone(),
        rule_or_code: decision.rule_id.clone().unwrap_or_else(|| decision.code.clone()),
        risk_level: decision.risk_level,
        evidence_fingerprint: evidence_fingerprint(decision),
    }
}

/// Builds a deterministic fingerprint of a decision's evidence. Evidence
/// is a `BTreeMap`, so iteration order is already canonical.
fn evidence_fingerprint(decision: &Decision) -> String {
    decision.evidence.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&")
}

// ============================================================================
// SECTION: Dedup
// ============================================================================

/// Domain a decision belongs to, for dedup priority purposes. Decisions
/// don't carry their emitting validator's domain directly, so the engine
/// passes it alongside each decision via this wrapper.
pub struct DecisionWithDomain {
    /// The decision itself.
    pub decision: Decision,
    /// Domain of the validator (or subsystem) that produced it.
    pub domain: String,
}

/// Deduplicates decisions, returning them in original relative order with
/// suppressed siblings annotated and downgraded.
///
/// # Invariants
///
/// After dedup, no group contains two decisions with the same
/// `(tool, rule/code, key-evidence fingerprint)` where more than one has
/// `outcome == Block`.
#[must_use]
pub fn deduplicate(decisions: Vec<DecisionWithDomain>) -> Vec<Decision> {
    let mut groups: Vec<(DedupKey, Vec<usize>)> = Vec::new();
    let mut keys = Vec::with_capacity(decisions.len());
    for item in &decisions {
        keys.push(dedup_key(&item.decision));
    }
    for (index, key) in keys.iter().enumerate() {
        if let Some(group) = groups.iter_mut().find(|(existing, _)| existing == key) {
            group.1.push(index);
        } else {
            groups.push((key.clone(), vec![index]));
        }
    }

    let mut out: Vec<Option<Decision>> = decisions.iter().map(|item| Some(item.decision.clone())).collect();

    for (_, members) in groups {
        if members.len() < 2 {
            continue;
        }
        let primary_index = members
            .iter()
            .copied()
            .max_by_key(|&index| dedup_domain_priority(&decisions[index].domain))
            .unwrap_or(members[0]);
        let primary_code = decisions[primary_index].decision.code.clone();

        for &index in &members {
            if index == primary_index {
                continue;
            }
            if let Some(decision) = out[index].as_mut() {
                decision.suppressed_by = Some(primary_code.clone());
                if decision.outcome == DecisionOutcome::Block {
                    decision.outcome = DecisionOutcome::Allow;
                    decision.evidence.insert("dedup_downgraded_from".to_string(), serde_json::json!("block"));
                }
            }
        }
    }

    out.into_iter().flatten().collect()
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
    use fc_core::RiskLevel;

    use super::*;

    fn decision(code: &str, risk: RiskLevel) -> Decision {
        let mut decision = Decision::block(code, "v", "msg");
        decision.tool = Some("http_get".to_string());
        decision.risk_level = risk;
        decision.evidence.insert("host".to_string(), serde_json::json!("169.254.169.254"));
        decision
    }

    #[test]
    fn same_key_collapses_to_one_block() {
        let security = DecisionWithDomain { decision: decision("FC_A", RiskLevel::High), domain: "security".to_string() };
        let dlp = DecisionWithDomain { decision: decision("FC_A", RiskLevel::High), domain: "dlp".to_string() };
        let result = deduplicate(vec![security, dlp]);
        let blocking: Vec<_> = result.iter().filter(|decision| decision.outcome == DecisionOutcome::Block).collect();
        assert_eq!(blocking.len(), 1);
        assert_eq!(blocking[0].code, "FC_A");
    }

    #[test]
    fn distinct_evidence_is_not_merged() {
        let mut a = decision("FC_A", RiskLevel::High);
        a.evidence.insert("host".to_string(), serde_json::json!("host-a"));
        let mut b = decision("FC_A", RiskLevel::High);
        b.evidence.insert("host".to_string(), serde_json::json!("host-b"));
        let result = deduplicate(vec![
            DecisionWithDomain { decision: a, domain: "security".to_string() },
            DecisionWithDomain { decision: b, domain: "security".to_string() },
        ]);
        assert_eq!(result.iter().filter(|decision| decision.outcome == DecisionOutcome::Block).count(), 2);
    }
}
