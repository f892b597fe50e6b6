// fc-taint/src/store.rs
// ============================================================================
// Module: Taint Store
// Description: Per-run storage of tainted step outputs, keyed by step id.
// Purpose: Let the engine and the taint-flow validator share one source of
//          truth for "what is tainted and where did it come from".
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! A [`TaintStore`] is append-only from the engine's point of view: a step
//! either has no tags (never tainted) or a non-empty set accumulated over
//! the run. Storage is a `BTreeMap<StepId, Vec<TaintTag>>` so iteration is
//! deterministic; a run holds exactly one store for its lifetime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use fc_core::StepId;
use fc_core::TaintTag;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Per-run store of tainted step outputs.
#[derive(Debug, Default, Clone)]
pub struct TaintStore {
    tags: BTreeMap<StepId, Vec<TaintTag>>,
}

impl TaintStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `tags` for `step_id`, appending to any tags already present.
    pub fn record(&mut self, step_id: StepId, tags: Vec<TaintTag>) {
        if tags.is_empty() {
            return;
        }
        self.tags.entry(step_id).or_default().extend(tags);
    }

    /// Returns whether `step_id` has recorded taint.
    #[must_use]
    pub fn is_tainted(&self, step_id: &StepId) -> bool {
        self.tags.get(step_id).is_some_and(|tags| !tags.is_empty())
    }

    /// Returns the tags recorded for `step_id`, if any.
    #[must_use]
    pub fn get_tags(&self, step_id: &StepId) -> &[TaintTag] {
        self.tags.get(step_id).map_or(&[], Vec::as_slice)
    }

    /// Returns the union of tags across `step_ids`, each propagated one hop
    /// deeper via [`TaintTag::propagated`].
    #[must_use]
    pub fn propagated_union(&self, step_ids: &[StepId]) -> Vec<TaintTag> {
        step_ids.iter().flat_map(|id| self.get_tags(id)).map(TaintTag::propagated).collect()
    }

    /// Number of steps with recorded taint.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Returns `true` when no step has recorded taint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
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
    use fc_core::DataSensitivity;

    use super::*;

    #[test]
    fn fresh_store_reports_no_taint() {
        let store = TaintStore::new();
        assert!(!store.is_tainted(&StepId::new("s1")));
        assert!(store.get_tags(&StepId::new("s1")).is_empty());
    }

    #[test]
    fn record_marks_step_tainted() {
        let mut store = TaintStore::new();
        let tag = TaintTag::origin(DataSensitivity::Pii, "customer_email", "read_file", StepId::new("s1"));
        store.record(StepId::new("s1"), vec![tag]);
        assert!(store.is_tainted(&StepId::new("s1")));
        assert_eq!(store.get_tags(&StepId::new("s1")).len(), 1);
    }

    #[test]
    fn propagated_union_increments_depth() {
        let mut store = TaintStore::new();
        let tag = TaintTag::origin(DataSensitivity::Secret, "api_key", "read_file", StepId::new("s1"));
        store.record(StepId::new("s1"), vec![tag]);

        let propagated = store.propagated_union(&[StepId::new("s1")]);
        assert_eq!(propagated.len(), 1);
        assert_eq!(propagated[0].propagation_depth, 1);
    }

    #[test]
    fn recording_empty_tags_is_a_no_op() {
        let mut store = TaintStore::new();
        store.record(StepId::new("s1"), Vec::new());
        assert!(store.is_empty());
    }
}
