// fc-policy/src/layout.rs
// ============================================================================
// Module: FailCore Filesystem Layout
// Description: Canonical paths under a `failcore_root` directory.
// Purpose: Centralize the run/trace/policy directory conventions.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! A FailCore deployment roots everything under a `failcore_root` directory
//! (default `.failcore/`): per-run trace files and sandboxes, and the
//! three-layer policy directory. This module is the single place that
//! names these paths so every crate agrees on the layout.

use std::path::Path;
use std::path::PathBuf;

use fc_core::RunId;

/// Default directory name for `failcore_root` when the caller does not
/// override it.
pub const DEFAULT_ROOT_DIR: &str = ".failcore";

/// Layout of on-disk paths rooted at a `failcore_root` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailcoreLayout {
    root: PathBuf,
}

impl FailcoreLayout {
    /// Builds a layout rooted at the given directory.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Builds a layout rooted at [`DEFAULT_ROOT_DIR`] relative to `base`.
    #[must_use]
    pub fn under(base: &Path) -> Self {
        Self::new(base.join(DEFAULT_ROOT_DIR))
    }

    /// Returns the `failcore_root` directory itself.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `runs/<run_id>/trace.jsonl`.
    #[must_use]
    pub fn trace_path(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("trace.jsonl")
    }

    /// Returns `runs/<run_id>/sandbox/`.
    #[must_use]
    pub fn sandbox_dir(&self, run_id: &RunId) -> PathBuf {
        self.run_dir(run_id).join("sandbox")
    }

    /// Returns `runs/<run_id>/`.
    #[must_use]
    pub fn run_dir(&self, run_id: &RunId) -> PathBuf {
        self.root.join("runs").join(run_id.as_str())
    }

    /// Returns the policy directory, `validate/`.
    #[must_use]
    pub fn policy_dir(&self) -> PathBuf {
        self.root.join("validate")
    }

    /// Returns `validate/active.yaml`.
    #[must_use]
    pub fn active_policy_path(&self) -> PathBuf {
        self.policy_dir().join("active.yaml")
    }

    /// Returns `validate/shadow.yaml`.
    #[must_use]
    pub fn shadow_policy_path(&self) -> PathBuf {
        self.policy_dir().join("shadow.yaml")
    }

    /// Returns `validate/breakglass.yaml`.
    #[must_use]
    pub fn breakglass_policy_path(&self) -> PathBuf {
        self.policy_dir().join("breakglass.yaml")
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths_match_spec_convention() {
        let layout = FailcoreLayout::under(Path::new("/srv/app"));
        let run_id = RunId::new("run-1");
        assert_eq!(layout.trace_path(&run_id), PathBuf::from("/srv/app/.failcore/runs/run-1/trace.jsonl"));
        assert_eq!(layout.sandbox_dir(&run_id), PathBuf::from("/srv/app/.failcore/runs/run-1/sandbox"));
        assert_eq!(layout.active_policy_path(), PathBuf::from("/srv/app/.failcore/validate/active.yaml"));
    }
}
