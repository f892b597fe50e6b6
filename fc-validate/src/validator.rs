// fc-validate/src/validator.rs
// ============================================================================
// Module: FailCore Validator Contract
// Description: The capability every validator implements, plus its registry.
// Purpose: Let the engine treat built-in and plugin validators identically.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! A validator is anything implementing [`BaseValidator`]: a stable id, a
//! domain used for ordering, an optional config schema, a default config,
//! and an `evaluate` method. The [`ValidatorRegistry`] holds the set of
//! validators a run context knows about; built-ins are registered at
//! bootstrap, plugins may be registered afterward. A registration error
//! (duplicate id) is reported to the caller but never crashes anything
//! already registered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use fc_core::Context;
use fc_core::Decision;
use fc_core::ValidatorConfig;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Validator Errors
// ============================================================================

/// Errors a validator implementation may raise during `evaluate`.
///
/// The engine never propagates these to its caller: it synthesizes a
/// single blocking [`Decision`] with code
/// [`fc_core::codes::ENGINE_VALIDATOR_ERROR`] instead.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The validator's configuration bag failed to parse.
    #[error("invalid validator config: {0}")]
    InvalidConfig(String),
    /// The validator failed for a reason internal to its implementation.
    #[error("validator failed: {0}")]
    Failed(String),
}

// ============================================================================
// SECTION: BaseValidator
// ============================================================================

/// The single capability every FailCore validator implements.
pub trait BaseValidator: Send + Sync {
    /// Stable, lowercase-snake-case identifier, e.g. `security_path_traversal`.
    fn id(&self) -> &str;

    /// Domain used for priority ordering, e.g. `security`, `network`.
    fn domain(&self) -> &str;

    /// Optional JSON Schema (Draft-7 subset) describing this validator's
    /// config bag. `None` means the validator accepts any config.
    fn config_schema(&self) -> Option<Value> {
        None
    }

    /// Default configuration merged under any caller-supplied overrides.
    fn default_config(&self) -> BTreeMap<String, Value>;

    /// Evaluates one [`Context`] and returns zero or more [`Decision`]s.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] when the validator cannot complete
    /// evaluation; the engine converts this into a synthetic blocking
    /// decision rather than aborting the run.
    fn evaluate(&self, context: &Context, config: &ValidatorConfig) -> Result<Vec<Decision>, ValidatorError>;

    /// Merges `config.config` over [`Self::default_config`], returning the
    /// effective configuration bag.
    fn effective_config(&self, config: &ValidatorConfig) -> BTreeMap<String, Value> {
        let mut merged = self.default_config();
        for (key, value) in &config.config {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Error raised when registering a validator under an id already taken.
#[derive(Debug, Error)]
#[error("validator id already registered: {0}")]
pub struct DuplicateValidatorId(pub String);

/// Holds the set of validators a run context knows about, keyed by id so
/// lookups and deterministic iteration are both free.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, Box<dyn BaseValidator>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a validator.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateValidatorId`] when a validator with the same id
    /// is already registered; the existing registration is left intact.
    pub fn register(&mut self, validator: Box<dyn BaseValidator>) -> Result<(), DuplicateValidatorId> {
        let id = validator.id().to_string();
        if self.validators.contains_key(&id) {
            return Err(DuplicateValidatorId(id));
        }
        self.validators.insert(id, validator);
        Ok(())
    }

    /// Returns the validator registered under `id`, if any.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&dyn BaseValidator> {
        self.validators.get(id).map(std::convert::AsRef::as_ref)
    }

    /// Returns all registered validator ids in lexicographic order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.validators.keys().map(String::as_str).collect()
    }

    /// Iterates over all registered validators.
    pub fn iter(&self) -> impl Iterator<Item = &dyn BaseValidator> {
        self.validators.values().map(std::convert::AsRef::as_ref)
    }

    /// Returns the number of registered validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Returns `true` when no validators are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
