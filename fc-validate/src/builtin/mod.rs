// fc-validate/src/builtin/mod.rs
// ============================================================================
// Module: Built-In Validators
// Description: Registers every validator shipped with FailCore itself.
// Purpose: Give a fresh `ValidatorRegistry` a sane default validator set.
// Dependencies: crate::validator
// ============================================================================

//! ## Overview
//! Built-ins are plain [`crate::validator::BaseValidator`] implementations;
//! nothing here is privileged over a plugin-loaded validator. Callers who
//! want a subset can register them individually instead of calling
//! [`register_builtins`].

pub mod file_size;
pub mod output_contract;
pub mod path_traversal;
pub mod required_fields;
pub mod ssrf;

use crate::validator::DuplicateValidatorId;
use crate::validator::ValidatorRegistry;

/// Registers every built-in validator into `registry`.
///
/// # Errors
///
/// Returns [`DuplicateValidatorId`] if `registry` already has an entry
/// under one of the built-in ids; no further built-ins are registered
/// once that happens, mirroring [`ValidatorRegistry::register`]'s
/// leave-existing-state-intact behavior.
pub fn register_builtins(registry: &mut ValidatorRegistry) -> Result<(), DuplicateValidatorId> {
    registry.register(Box::new(path_traversal::PathTraversalValidator::new()))?;
    registry.register(Box::new(ssrf::SsrfValidator::new()))?;
    registry.register(Box::new(required_fields::RequiredFieldsValidator::new()))?;
    registry.register(Box::new(file_size::FileSizeValidator::new()))?;
    registry.register(Box::new(output_contract::OutputContractValidator::new()))?;
    Ok(())
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
    fn registers_five_builtins() {
        let mut registry = ValidatorRegistry::new();
        register_builtins(&mut registry).unwrap();
        assert_eq!(registry.len(), 5);
    }
}
