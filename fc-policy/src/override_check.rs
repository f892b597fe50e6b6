// fc-policy/src/override_check.rs
// ============================================================================
// Module: FailCore Break-Glass Override
// Description: Resolves whether a global break-glass override is active.
// Purpose: Share one implementation of the override-activation predicate.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! A global override is active only when it is enabled, its token
//! requirement is satisfied (either not required, or the configured
//! environment variable is present and non-empty), and — if an expiry is
//! set — the current time is still before it. The validation engine
//! consults this once per `evaluate` call rather than per decision.

use fc_core::GlobalOverride;
use fc_core::Timestamp;

/// Returns `true` when the global break-glass override is currently active.
///
/// `token_present` should reflect whether the environment variable named
/// by [`GlobalOverride::token_env_var`] is set to a non-empty value; the
/// caller reads the environment so this function stays free of I/O and is
/// trivially testable.
#[must_use]
pub fn is_override_active(global: &GlobalOverride, token_present: bool, now: Timestamp) -> bool {
    if !global.enabled {
        return false;
    }
    if global.require_token && !token_present {
        return false;
    }
    match global.expires_at {
        Some(expiry) => now <= expiry,
        None => true,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions are permitted."
)]
mod tests {
    use fc_core::Timestamp;

    use super::*;

    fn base_global() -> GlobalOverride {
        GlobalOverride {
            enabled: true,
            require_token: true,
            token_env_var: "FAILCORE_OVERRIDE_TOKEN".to_string(),
            expires_at: None,
        }
    }

    #[test]
    fn disabled_override_is_never_active() {
        let mut global = base_global();
        global.enabled = false;
        assert!(!is_override_active(&global, true, Timestamp::now()));
    }

    #[test]
    fn missing_token_blocks_activation_when_required() {
        let global = base_global();
        assert!(!is_override_active(&global, false, Timestamp::now()));
        assert!(is_override_active(&global, true, Timestamp::now()));
    }

    #[test]
    fn expiry_in_the_past_deactivates_override() {
        let mut global = base_global();
        global.require_token = false;
        let expiry = Timestamp::from_offset(
            Timestamp::now().as_offset() - time::Duration::seconds(3600),
        );
        global.expires_at = Some(expiry);
        assert!(!is_override_active(&global, false, Timestamp::now()));
    }

    #[test]
    fn expiry_in_the_future_keeps_override_active() {
        let mut global = base_global();
        global.require_token = false;
        let expiry = Timestamp::from_offset(
            Timestamp::now().as_offset() + time::Duration::seconds(3600),
        );
        global.expires_at = Some(expiry);
        assert!(is_override_active(&global, false, Timestamp::now()));
    }
}
