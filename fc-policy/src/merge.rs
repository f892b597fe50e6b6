// fc-policy/src/merge.rs
// ============================================================================
// Module: FailCore Policy Layer Merge
// Description: Three-layer (active, shadow, breakglass) policy composition.
// Purpose: Combine layered policy documents into one canonical `Policy`.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! A deployment may keep three policy layers on disk: `active` (the
//! production baseline), `shadow` (enforcement-mode overrides rolled out
//! for observation before going live), and `breakglass` (emergency
//! overrides). Merging is one-directional and deterministic: `shadow` can
//! only relax or tighten `enforcement`, `breakglass` can only grant
//! `allow_override` and the global override, and exceptions from every
//! layer that names a validator are concatenated rather than replaced.

// ============================================================================
// SECTION: Imports
// ============================================================================

use fc_core::Policy;
use fc_core::ValidatorConfig;

// ============================================================================
// SECTION: Merge
// ============================================================================

/// Merges `active`, `shadow`, and `breakglass` policy layers into one
/// canonical [`Policy`].
///
/// Merge rules, applied per validator id present in any layer:
/// - `enforcement` is taken from `shadow` when `shadow` declares that
///   validator, else from `active`.
/// - `allow_override` is taken from `breakglass` when `breakglass`
///   declares that validator, else from `active`.
/// - `exceptions` from all three layers are concatenated in
///   active-then-shadow-then-breakglass order.
/// - every other field (`enabled`, `domain`, `priority`, `config`) comes
///   from `active`, or from `shadow`/`breakglass` if `active` does not
///   declare the validator at all.
/// - `global_override` is taken from `breakglass` when its `enabled` flag
///   is `true`, else from `active`.
/// - `version` and `metadata` are taken from `active`.
#[must_use]
pub fn merge_layers(active: &Policy, shadow: &Policy, breakglass: &Policy) -> Policy {
    let mut merged = Policy {
        version: active.version.clone(),
        validators: active.validators.clone(),
        global_override: active.global_override.clone(),
        metadata: active.metadata.clone(),
    };

    let mut ids: Vec<&String> =
        active.validators.keys().chain(shadow.validators.keys()).chain(breakglass.validators.keys()).collect();
    ids.sort();
    ids.dedup();

    for id in ids {
        let base = active.validators.get(id).cloned();
        let shadow_cfg = shadow.validators.get(id);
        let breakglass_cfg = breakglass.validators.get(id);

        let mut effective = base.unwrap_or_else(|| {
            shadow_cfg.or(breakglass_cfg).cloned().unwrap_or_else(|| fallback_config(id))
        });

        if let Some(shadow_cfg) = shadow_cfg {
            effective.enforcement = shadow_cfg.enforcement;
        }
        if let Some(breakglass_cfg) = breakglass_cfg {
            effective.allow_override = breakglass_cfg.allow_override;
        }

        let mut exceptions = active.validators.get(id).map(|cfg| cfg.exceptions.clone()).unwrap_or_default();
        if let Some(shadow_cfg) = shadow_cfg {
            exceptions.extend(shadow_cfg.exceptions.iter().cloned());
        }
        if let Some(breakglass_cfg) = breakglass_cfg {
            exceptions.extend(breakglass_cfg.exceptions.iter().cloned());
        }
        effective.exceptions = exceptions;

        merged.validators.insert(id.clone(), effective);
    }

    if breakglass.global_override.enabled {
        merged.global_override = breakglass.global_override.clone();
    }

    merged
}

/// Builds a minimal validator config for a validator id that appears only
/// in `shadow` or `breakglass` under an unusual domain-less configuration.
/// This is defensive: `shadow`/`breakglass` validators are expected to
/// mirror an `active` entry, but a missing `domain` must not panic.
fn fallback_config(id: &str) -> ValidatorConfig {
    ValidatorConfig {
        enabled: true,
        enforcement: fc_core::EnforcementMode::Block,
        domain: id.to_string(),
        priority: 0,
        config: std::collections::BTreeMap::new(),
        exceptions: Vec::new(),
        allow_override: false,
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
    use fc_core::EnforcementMode;
    use fc_core::Exception;

    use super::*;

    fn config(domain: &str, enforcement: EnforcementMode) -> ValidatorConfig {
        ValidatorConfig {
            enabled: true,
            enforcement,
            domain: domain.to_string(),
            priority: 0,
            config: std::collections::BTreeMap::new(),
            exceptions: Vec::new(),
            allow_override: false,
        }
    }

    #[test]
    fn shadow_overrides_enforcement_only() {
        let mut active = Policy::default();
        active.validators.insert("security_path_traversal".to_string(), config("security", EnforcementMode::Block));
        let mut shadow = Policy::default();
        shadow
            .validators
            .insert("security_path_traversal".to_string(), config("security", EnforcementMode::Warn));
        let breakglass = Policy::default();

        let merged = merge_layers(&active, &shadow, &breakglass);
        let effective = merged.validators.get("security_path_traversal").unwrap();
        assert_eq!(effective.enforcement, EnforcementMode::Warn);
        assert_eq!(effective.domain, "security");
    }

    #[test]
    fn breakglass_grants_override_and_global_flag() {
        let mut active = Policy::default();
        active.validators.insert("network_ssrf".to_string(), config("network", EnforcementMode::Block));
        let shadow = Policy::default();
        let mut breakglass = Policy::default();
        let mut bg_config = config("network", EnforcementMode::Block);
        bg_config.allow_override = true;
        breakglass.validators.insert("network_ssrf".to_string(), bg_config);
        breakglass.global_override.enabled = true;

        let merged = merge_layers(&active, &shadow, &breakglass);
        assert!(merged.validators.get("network_ssrf").unwrap().allow_override);
        assert!(merged.global_override.enabled);
    }

    #[test]
    fn exceptions_concatenate_across_layers() {
        let mut active = Policy::default();
        let mut active_cfg = config("security", EnforcementMode::Block);
        active_cfg.exceptions.push(Exception {
            rule_id: "from-active".to_string(),
            reason: "legacy".to_string(),
            expires_at: None,
            scope: None,
            created_by: None,
            created_at: None,
        });
        active.validators.insert("security_path_traversal".to_string(), active_cfg);

        let mut shadow = Policy::default();
        let mut shadow_cfg = config("security", EnforcementMode::Warn);
        shadow_cfg.exceptions.push(Exception {
            rule_id: "from-shadow".to_string(),
            reason: "rollout".to_string(),
            expires_at: None,
            scope: None,
            created_by: None,
            created_at: None,
        });
        shadow.validators.insert("security_path_traversal".to_string(), shadow_cfg);

        let breakglass = Policy::default();
        let merged = merge_layers(&active, &shadow, &breakglass);
        let effective = merged.validators.get("security_path_traversal").unwrap();
        assert_eq!(effective.exceptions.len(), 2);
    }
}
