// fc-policy/src/loader.rs
// ============================================================================
// Module: FailCore Policy Loader
// Description: Fail-closed, size-capped loading of policy documents.
// Purpose: Turn an untrusted YAML/JSON file into a validated `Policy`.
// Dependencies: fc-core, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! A policy file may be YAML or JSON; format is sniffed from the file
//! extension and, failing that, from content (`{` as the first
//! non-whitespace byte means JSON). Loading enforces hard size and path
//! limits so a malformed or hostile policy file cannot exhaust memory or
//! escape its expected directory depth.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use fc_core::Policy;

use crate::error::PolicyError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum policy file size in bytes.
pub const MAX_POLICY_FILE_SIZE: usize = 4 * 1024 * 1024;
/// Maximum length of a single path component.
pub const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Format
// ============================================================================

/// Serialization format for a policy document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFormat {
    /// YAML document.
    Yaml,
    /// JSON document.
    Json,
}

impl PolicyFormat {
    /// Sniffs the format from a file extension, defaulting to `Yaml` for
    /// unrecognized or missing extensions.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// Loads and validates a [`Policy`] from a file on disk.
///
/// # Errors
///
/// Returns [`PolicyError`] when the path is unsafe, the file is too large,
/// the content fails to parse, or the parsed policy fails validation.
pub fn load_policy_file(path: &Path) -> Result<Policy, PolicyError> {
    validate_path(path)?;
    let bytes = fs::read(path).map_err(|err| PolicyError::Io(err.to_string()))?;
    if bytes.len() > MAX_POLICY_FILE_SIZE {
        return Err(PolicyError::Invalid("policy file exceeds size limit".to_string()));
    }
    let content =
        std::str::from_utf8(&bytes).map_err(|_| PolicyError::Invalid("policy file must be utf-8".to_string()))?;
    let policy = parse_policy_str(content, PolicyFormat::from_path(path))?;
    validate_policy(&policy)?;
    Ok(policy)
}

/// Loads a [`Policy`] from a file if it exists, or returns [`Policy::default`]
/// when the path is absent. Used for layered policy directories where the
/// `shadow` and `breakglass` layers are optional.
///
/// # Errors
///
/// Returns [`PolicyError`] when the file exists but fails to load.
pub fn load_policy_file_or_default(path: &Path) -> Result<Policy, PolicyError> {
    if path.exists() { load_policy_file(path) } else { Ok(Policy::default()) }
}

/// Parses a policy document from a string in the given format.
///
/// # Errors
///
/// Returns [`PolicyError`] when the content does not parse.
pub fn parse_policy_str(content: &str, format: PolicyFormat) -> Result<Policy, PolicyError> {
    match format {
        PolicyFormat::Yaml => serde_yaml::from_str(content).map_err(|err| PolicyError::Yaml(err.to_string())),
        PolicyFormat::Json => serde_json::from_str(content).map_err(|err| PolicyError::Json(err.to_string())),
    }
}

/// Serializes a policy document to a string in the given format.
///
/// # Errors
///
/// Returns [`PolicyError`] when serialization fails, which only happens for
/// values containing non-finite floats or non-string map keys, neither of
/// which `Policy` can produce.
pub fn dump_policy_str(policy: &Policy, format: PolicyFormat) -> Result<String, PolicyError> {
    match format {
        PolicyFormat::Yaml => serde_yaml::to_string(policy).map_err(|err| PolicyError::Yaml(err.to_string())),
        PolicyFormat::Json => {
            serde_json::to_string_pretty(policy).map_err(|err| PolicyError::Json(err.to_string()))
        }
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates structural invariants of a loaded policy that go beyond what
/// serde can express: non-empty validator ids and domains.
fn validate_policy(policy: &Policy) -> Result<(), PolicyError> {
    for (id, config) in &policy.validators {
        if id.trim().is_empty() {
            return Err(PolicyError::Invalid("validator id must be non-empty".to_string()));
        }
        if config.domain.trim().is_empty() {
            return Err(PolicyError::Invalid(format!("validators.{id}.domain must be non-empty")));
        }
        for exception in &config.exceptions {
            if exception.rule_id.trim().is_empty() {
                return Err(PolicyError::Invalid(format!(
                    "validators.{id}.exceptions.rule_id must be non-empty"
                )));
            }
        }
    }
    Ok(())
}

/// Validates a policy file path against size and traversal-depth limits.
fn validate_path(path: &Path) -> Result<(), PolicyError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(PolicyError::Invalid("policy path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(PolicyError::Invalid("policy path component too long".to_string()));
        }
    }
    Ok(())
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
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn round_trips_through_yaml() {
        let mut policy = Policy::default();
        policy.metadata.insert("owner".to_string(), serde_json::Value::String("platform".to_string()));
        let dumped = dump_policy_str(&policy, PolicyFormat::Yaml).unwrap();
        let parsed = parse_policy_str(&dumped, PolicyFormat::Yaml).unwrap();
        assert_eq!(policy, parsed);
    }

    #[test]
    fn missing_layer_file_yields_default() {
        let path = Path::new("/nonexistent/failcore/validate/shadow.yaml");
        let policy = load_policy_file_or_default(path).unwrap();
        assert!(policy.is_empty());
    }

    #[test]
    fn rejects_empty_validator_id_domain() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "version: v1\nvalidators:\n  my_validator:\n    domain: \"\"\n").unwrap();
        let result = load_policy_file(file.path());
        assert!(result.is_err());
    }
}
