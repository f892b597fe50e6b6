// fc-pipeline/src/side_effect.rs
// ============================================================================
// Module: Side-Effect Boundary Gate
// Description: Predicts a call's side-effect category and checks it
//              against an optional configured boundary.
// Purpose: Back pipeline stage 3, the side-effect boundary check.
// Dependencies: fc-core
// ============================================================================

//! ## Overview
//! Prediction is heuristic and cheap by design: it runs before dispatch, so
//! it can only reason about the tool name and its declared parameters, not
//! what the tool actually does. The heuristics mirror the parameter-name
//! conventions `fc-validate`'s built-in validators already use (`path`,
//! `file_path`, `host`, `url`) so a step that would trip the path-traversal
//! or SSRF validator also predicts the matching side-effect category here.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use fc_core::SideEffectType;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Boundary
// ============================================================================

/// Optional configured set of allowed side-effect categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideEffectBoundary {
    /// Categories this boundary allows; any predicted category outside
    /// this set is a crossing.
    pub allowed: BTreeSet<SideEffectType>,
}

impl SideEffectBoundary {
    /// Builds a boundary allowing exactly `allowed`.
    #[must_use]
    pub fn new(allowed: BTreeSet<SideEffectType>) -> Self {
        Self { allowed }
    }

    /// `true` when `predicted` is outside this boundary's allowed set.
    #[must_use]
    pub fn crosses(&self, predicted: SideEffectType) -> bool {
        !self.allowed.contains(&predicted)
    }
}

// ============================================================================
// SECTION: Prediction
// ============================================================================

const WRITE_TOOL_MARKERS: &[&str] = &["write", "delete", "remove", "rm_"];
const EXEC_TOOL_MARKERS: &[&str] = &["exec", "run_shell", "run_command", "spawn"];
const NETWORK_TOOL_MARKERS: &[&str] = &["http_", "fetch", "request", "download", "upload", "send_", "publish", "post", "get_url"];
const PATH_PARAM_NAMES: &[&str] = &["path", "file_path", "relative_path"];
const NETWORK_PARAM_NAMES: &[&str] = &["url", "host", "hostname", "endpoint", "uri"];

/// Predicts the side-effect category a call is likely to produce, or
/// `None` when nothing about the tool name or params suggests one.
#[must_use]
pub fn predict(tool: &str, params: &Map<String, Value>) -> Option<SideEffectType> {
    let tool_lower = tool.to_lowercase();

    if EXEC_TOOL_MARKERS.iter().any(|marker| tool_lower.contains(marker)) {
        return Some(SideEffectType::ExecCommand);
    }

    if NETWORK_TOOL_MARKERS.iter().any(|marker| tool_lower.contains(marker)) || NETWORK_PARAM_NAMES.iter().any(|name| params.contains_key(*name)) {
        return Some(classify_network(params));
    }

    if PATH_PARAM_NAMES.iter().any(|name| params.contains_key(*name)) {
        return Some(if WRITE_TOOL_MARKERS.iter().any(|marker| tool_lower.contains(marker)) { SideEffectType::FilesystemWrite } else { SideEffectType::FilesystemRead });
    }

    None
}

fn classify_network(params: &Map<String, Value>) -> SideEffectType {
    let candidate = NETWORK_PARAM_NAMES.iter().find_map(|name| params.get(*name)).and_then(Value::as_str);
    let Some(text) = candidate else { return SideEffectType::NetworkEgress };

    let host = url::Url::parse(text).ok().and_then(|url| url.host_str().map(str::to_string)).unwrap_or_else(|| text.to_string());

    if let Ok(ip) = host.parse::<std::net::IpAddr>() {
        if !ip.is_global_approx() {
            return SideEffectType::NetworkPrivate;
        }
    }

    SideEffectType::NetworkEgress
}

/// Local, dependency-free stand-in for the unstable `IpAddr::is_global`:
/// anything loopback, private, or link-local counts as non-global for the
/// purpose of this coarse pre-dispatch prediction. The SSRF validator
/// (stage 2) is the authoritative, exhaustive check; this only decides
/// which side-effect bucket a predicted network call falls into.
trait IsGlobalApprox {
    fn is_global_approx(&self) -> bool;
}

impl IsGlobalApprox for std::net::IpAddr {
    fn is_global_approx(&self) -> bool {
        match self {
            std::net::IpAddr::V4(v4) => !(v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified() || v4.is_multicast()),
            std::net::IpAddr::V6(v6) => !(v6.is_loopback() || v6.is_unspecified() || v6.is_multicast()),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    fn params(value: Value) -> Map<String, Value> {
        let Value::Object(map) = value else { panic!("expected object") };
        map
    }

    #[test]
    fn write_tool_with_path_param_predicts_filesystem_write() {
        let predicted = predict("write_file", &params(serde_json::json!({"path": "/tmp/x"})));
        assert_eq!(predicted, Some(SideEffectType::FilesystemWrite));
    }

    #[test]
    fn read_tool_with_path_param_predicts_filesystem_read() {
        let predicted = predict("read_file", &params(serde_json::json!({"path": "/tmp/x"})));
        assert_eq!(predicted, Some(SideEffectType::FilesystemRead));
    }

    #[test]
    fn link_local_host_predicts_network_private() {
        let predicted = predict("http_request", &params(serde_json::json!({"host": "169.254.169.254"})));
        assert_eq!(predicted, Some(SideEffectType::NetworkPrivate));
    }

    #[test]
    fn public_host_predicts_network_egress() {
        let predicted = predict("http_request", &params(serde_json::json!({"host": "api.stripe.com"})));
        assert_eq!(predicted, Some(SideEffectType::NetworkEgress));
    }

    #[test]
    fn unrelated_tool_predicts_nothing() {
        let predicted = predict("list_widgets", &params(serde_json::json!({})));
        assert_eq!(predicted, None);
    }

    #[test]
    fn boundary_flags_categories_outside_the_allowed_set() {
        let boundary = SideEffectBoundary::new(BTreeSet::from([SideEffectType::FilesystemRead]));
        assert!(!boundary.crosses(SideEffectType::FilesystemRead));
        assert!(boundary.crosses(SideEffectType::FilesystemWrite));
    }
}
