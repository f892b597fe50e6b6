// fc-policy/src/lib.rs
// ============================================================================
// Module: FailCore Policy Library
// Description: Loading, layering, and filesystem layout for policy documents.
// Purpose: Turn on-disk YAML/JSON policy layers into one canonical `Policy`.
// Dependencies: fc-core, crate::{error, loader, merge, layout, override_check}
// ============================================================================

//! ## Overview
//! `fc-policy` is the Policy Store described in the runtime overview: it
//! loads the three layered policy files (`active`, `shadow`, `breakglass`)
//! from a `failcore_root/validate/` directory into a single canonical
//! [`fc_core::Policy`], and resolves whether a break-glass override is
//! currently active. It does not evaluate validators — that is
//! `fc-validate`'s job — it only produces the data those validators
//! consult.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod layout;
pub mod loader;
pub mod merge;
pub mod override_check;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::PolicyError;
pub use layout::DEFAULT_ROOT_DIR;
pub use layout::FailcoreLayout;
pub use loader::MAX_POLICY_FILE_SIZE;
pub use loader::PolicyFormat;
pub use loader::dump_policy_str;
pub use loader::load_policy_file;
pub use loader::load_policy_file_or_default;
pub use loader::parse_policy_str;
pub use merge::merge_layers;
pub use override_check::is_override_active;

use fc_core::Policy;

/// Loads and merges the three policy layers from a [`FailcoreLayout`].
///
/// Missing layer files are treated as empty policies (see
/// [`load_policy_file_or_default`]); only a present-but-malformed file is
/// an error.
///
/// # Errors
///
/// Returns [`PolicyError`] when a present layer file fails to load.
pub fn load_layered_policy(layout: &FailcoreLayout) -> Result<Policy, PolicyError> {
    let active = load_policy_file_or_default(&layout.active_policy_path())?;
    let shadow = load_policy_file_or_default(&layout.shadow_policy_path())?;
    let breakglass = load_policy_file_or_default(&layout.breakglass_policy_path())?;
    Ok(merge_layers(&active, &shadow, &breakglass))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn layered_load_tolerates_missing_shadow_and_breakglass() {
        let dir = TempDir::new().unwrap();
        let layout = FailcoreLayout::under(dir.path());
        fs::create_dir_all(layout.policy_dir()).unwrap();
        fs::write(layout.active_policy_path(), "version: v1\nvalidators: {}\n").unwrap();

        let policy = load_layered_policy(&layout).unwrap();
        assert_eq!(policy.version, "v1");
        assert!(policy.is_empty());
    }
}
