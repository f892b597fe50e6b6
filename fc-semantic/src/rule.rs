// fc-semantic/src/rule.rs
// ============================================================================
// Module: Semantic Rule Contract
// Description: The capability every semantic rule implements, plus its registry.
// Purpose: Let the guard treat built-in and plugin rules identically.
// Dependencies: fc-core, crate::ast, crate::verdict
// ============================================================================

//! ## Overview
//! Mirrors `fc-validate`'s `BaseValidator`/`ValidatorRegistry` pair: a
//! rule is anything implementing [`SemanticRule`], and a
//! [`RuleRegistry`] holds the set a guard instance knows about. An
//! internal rule error never stops the guard — see
//! [`crate::guard::SemanticGuard::evaluate`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use fc_core::RiskLevel;
use thiserror::Error;

use crate::ast::CallAst;
use crate::verdict::RuleFinding;

// ============================================================================
// SECTION: Rule Errors
// ============================================================================

/// Error a rule implementation may raise during evaluation.
///
/// This is explicitly **not** a violation: the guard
/// logs it, increments a statistics counter, and continues with the
/// remaining rules.
#[derive(Debug, Error)]
#[error("semantic rule failed: {0}")]
pub struct SemanticRuleError(pub String);

// ============================================================================
// SECTION: SemanticRule
// ============================================================================

/// The single capability every FailCore semantic rule implements.
pub trait SemanticRule: Send + Sync {
    /// Stable, lowercase-snake-case identifier, e.g. `shell_download_execute`.
    fn id(&self) -> &str;

    /// Severity assigned to a finding from this rule.
    fn severity(&self) -> RiskLevel;

    /// Evaluates one call's [`CallAst`], returning a finding if the rule's
    /// condition is met.
    ///
    /// # Errors
    ///
    /// Returns [`SemanticRuleError`] when the rule cannot complete
    /// evaluation; the guard treats this as "no finding", not a block.
    fn evaluate(&self, ast: &CallAst) -> Result<Option<RuleFinding>, SemanticRuleError>;
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Error raised when registering a rule under an id already taken.
#[derive(Debug, Error)]
#[error("semantic rule id already registered: {0}")]
pub struct DuplicateRuleId(pub String);

/// Holds the set of rules a guard instance knows about, keyed by id so
/// lookups and deterministic iteration are both free.
#[derive(Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, Box<dyn SemanticRule>>,
}

impl RuleRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a rule.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateRuleId`] when a rule with the same id is already
    /// registered; the existing registration is left intact.
    pub fn register(&mut self, rule: Box<dyn SemanticRule>) -> Result<(), DuplicateRuleId> {
        let id = rule.id().to_string();
        if self.rules.contains_key(&id) {
            return Err(DuplicateRuleId(id));
        }
        self.rules.insert(id, rule);
        Ok(())
    }

    /// Iterates over all registered rules in id order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn SemanticRule> {
        self.rules.values().map(std::convert::AsRef::as_ref)
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
