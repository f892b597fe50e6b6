// fc-core/src/fingerprint.rs
// ============================================================================
// Module: FailCore Fingerprinting
// Description: Canonical identity hashing for tool calls.
// Purpose: Provide deterministic fingerprints for replay indexing and dedup.
// Dependencies: serde_json, sha2
// ============================================================================

//! ## Overview
//! A [`Fingerprint`] is the canonical identity of a tool call over its
//! parameters: `tool#sha256(sort_keys(params))`. Two calls with the same
//! tool and the same parameters — regardless of key order in the source
//! JSON — produce the same fingerprint, which is what lets the replay
//! engine index historical steps and the drift engine group by tool.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while computing a fingerprint.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// Parameters could not be canonicalized to JSON.
    #[error("failed to canonicalize params: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// Canonical identity of a tool call: `tool#<hex digest>`.
///
/// # Invariants
/// - Deterministic under key reordering in `params`: shuffling the
///   top-level (and any nested) object keys never changes the digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint {
    tool: String,
    digest_hex: String,
}

impl Fingerprint {
    /// Returns the tool name this fingerprint was computed for.
    #[must_use]
    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Returns the lowercase hex digest of the canonicalized parameters.
    #[must_use]
    pub fn digest_hex(&self) -> &str {
        &self.digest_hex
    }

    /// Returns the canonical string form `tool#digest`.
    #[must_use]
    pub fn as_canonical(&self) -> String {
        format!("{}#{}", self.tool, self.digest_hex)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tool, self.digest_hex)
    }
}

/// Computes the canonical fingerprint for a tool call.
///
/// # Errors
///
/// Returns [`FingerprintError`] when `params` cannot be canonicalized.
pub fn fingerprint_params(
    tool: &str,
    params: &serde_json::Map<String, Value>,
) -> Result<Fingerprint, FingerprintError> {
    let canonical = canonicalize(&Value::Object(params.clone()));
    let bytes = serde_json::to_vec(&canonical)
        .map_err(|err| FingerprintError::Canonicalization(err.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(tool.as_bytes());
    hasher.update(b"\0");
    hasher.update(&bytes);
    let digest = hasher.finalize();
    Ok(Fingerprint {
        tool: tool.to_string(),
        digest_hex: hex_encode(&digest),
    })
}

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Recursively sorts object keys so JSON values with the same content but
/// different key order serialize identically.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = serde_json::Map::with_capacity(sorted.len());
            for (key, val) in sorted {
                out.insert(key.clone(), canonicalize(val));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
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
    use serde_json::json;

    use super::fingerprint_params;

    fn obj(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }
    use serde_json::Value;

    #[test]
    fn deterministic_under_key_reordering() {
        let a = obj(json!({"path": "/x", "mode": "r"}));
        let b = obj(json!({"mode": "r", "path": "/x"}));
        let fa = fingerprint_params("read_file", &a).unwrap();
        let fb = fingerprint_params("read_file", &b).unwrap();
        assert_eq!(fa, fb);
    }

    #[test]
    fn differs_by_tool_name() {
        let params = obj(json!({"path": "/x"}));
        let fa = fingerprint_params("read_file", &params).unwrap();
        let fb = fingerprint_params("write_file", &params).unwrap();
        assert_ne!(fa, fb);
    }

    #[test]
    fn nested_key_reordering_is_stable() {
        let a = obj(json!({"outer": {"a": 1, "b": 2}}));
        let b = obj(json!({"outer": {"b": 2, "a": 1}}));
        let fa = fingerprint_params("t", &a).unwrap();
        let fb = fingerprint_params("t", &b).unwrap();
        assert_eq!(fa, fb);
    }
}
