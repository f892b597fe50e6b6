// fc-core/src/codes.rs
// ============================================================================
// Module: FailCore Decision Codes
// Description: Stable, append-only decision and error code constants.
// Purpose: Give every call site a named constant instead of a magic string.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Decision and error codes are stable identifiers of the shape
//! `FC_{DOMAIN}_{CATEGORY}_{SPECIFIC}` (or a bare structural code such as
//! `PARAM_INVALID` for pipeline-level failures that precede any
//! validator). Once published, a code's meaning is immutable: new
//! behavior gets a new code, never a reinterpretation of an old one.

// ============================================================================
// SECTION: Structural
// ============================================================================

/// Step id, tool name, or params shape failed basic structural validation.
pub const PARAM_INVALID: &str = "PARAM_INVALID";
/// Dispatch could not resolve the named tool in the registry.
pub const TOOL_NOT_FOUND: &str = "TOOL_NOT_FOUND";
/// The tool function itself raised/returned an error during dispatch.
pub const TOOL_RAISED: &str = "TOOL_RAISED";

// ============================================================================
// SECTION: Security / Path
// ============================================================================

/// Resolved path escapes the sandbox root via `..` components.
pub const SEC_PATH_TRAVERSAL: &str = "FC_SEC_PATH_TRAVERSAL";
/// Resolved path is outside the sandbox for a reason other than `..`.
pub const SEC_SANDBOX_VIOLATION: &str = "FC_SEC_SANDBOX_VIOLATION";
/// Path uses a Windows UNC prefix (`\\server\share` or `//server/share`).
pub const SEC_PATH_UNC: &str = "FC_SEC_PATH_UNC";
/// Path uses a Windows NT device-namespace prefix (`\\?\` or `\\.\`).
pub const SEC_PATH_NT_PREFIX: &str = "FC_SEC_PATH_NT_PREFIX";
/// Path references a Windows device namespace (`GLOBALROOT`, `Device\`).
pub const SEC_PATH_DEVICE: &str = "FC_SEC_PATH_DEVICE";
/// Path contains an NTFS alternate data stream marker.
pub const SEC_PATH_ADS: &str = "FC_SEC_PATH_ADS";
/// Path mixes `/` and `\` separators.
pub const SEC_PATH_MIXED_SEPARATORS: &str = "FC_SEC_PATH_MIXED_SEPARATORS";
/// Path has trailing dots or spaces that Windows silently strips.
pub const SEC_PATH_TRAILING_MANIPULATION: &str = "FC_SEC_PATH_TRAILING_MANIPULATION";
/// Path could not be parsed or resolved at all.
pub const SEC_PATH_INVALID: &str = "FC_SEC_PATH_INVALID";

// ============================================================================
// SECTION: Network / SSRF
// ============================================================================

/// Hostname is `localhost` or `localhost.localdomain`.
pub const NET_SSRF_LOCALHOST: &str = "FC_NET_SSRF_LOCALHOST";
/// Hostname resolves to a loopback IP literal.
pub const NET_SSRF_LOOPBACK: &str = "FC_NET_SSRF_LOOPBACK";
/// Hostname resolves to a private-range IP literal.
pub const NET_SSRF_PRIVATE: &str = "FC_NET_SSRF_PRIVATE";
/// Hostname resolves to a link-local IP literal.
pub const NET_SSRF_LINK_LOCAL: &str = "FC_NET_SSRF_LINK_LOCAL";
/// Hostname resolves to a reserved IP literal.
pub const NET_SSRF_RESERVED: &str = "FC_NET_SSRF_RESERVED";
/// Hostname resolves to a multicast IP literal.
pub const NET_SSRF_MULTICAST: &str = "FC_NET_SSRF_MULTICAST";
/// Hostname resolves to the unspecified address.
pub const NET_SSRF_UNSPECIFIED: &str = "FC_NET_SSRF_UNSPECIFIED";
/// URL scheme is not in the configured allow-list.
pub const NET_SSRF_UNSAFE_PROTOCOL: &str = "FC_NET_SSRF_UNSAFE_PROTOCOL";
/// URL has no scheme component.
pub const NET_SSRF_NO_SCHEME: &str = "FC_NET_SSRF_NO_SCHEME";
/// URL has no hostname component.
pub const NET_SSRF_NO_HOSTNAME: &str = "FC_NET_SSRF_NO_HOSTNAME";
/// URL embeds userinfo credentials.
pub const NET_SSRF_USERINFO: &str = "FC_NET_SSRF_USERINFO";
/// Hostname did not match the configured domain allow-list.
pub const NET_SSRF_DOMAIN_NOT_ALLOWED: &str = "FC_NET_SSRF_DOMAIN_NOT_ALLOWED";
/// Port is not in the configured allow-list.
pub const NET_SSRF_PORT_NOT_ALLOWED: &str = "FC_NET_SSRF_PORT_NOT_ALLOWED";
/// URL parameter value was not a string.
pub const NET_SSRF_PARAM_TYPE: &str = "FC_NET_SSRF_PARAM_TYPE";
/// URL could not be parsed.
pub const NET_SSRF_INVALID_URL: &str = "FC_NET_SSRF_INVALID_URL";

// ============================================================================
// SECTION: Resource
// ============================================================================

/// Target file exceeds the configured maximum size.
pub const RES_FILE_SIZE_EXCEEDED: &str = "FC_RES_FILE_SIZE_EXCEEDED";
/// File-size parameter was not a usable path/type.
pub const RES_FILE_SIZE_PARAM_TYPE: &str = "FC_RES_FILE_SIZE_PARAM_TYPE";

// ============================================================================
// SECTION: Type
// ============================================================================

/// A configured required field was absent from the call's parameters.
pub const TYPE_REQUIRED_FIELD_MISSING: &str = "FC_TYPE_REQUIRED_FIELD_MISSING";

// ============================================================================
// SECTION: Output Contract
// ============================================================================

/// Observed output kind differs from the step's declared `expected_kind`.
pub const OUTPUT_CONTRACT_TYPE_MISMATCH: &str = "FC_OUTPUT_CONTRACT_TYPE_MISMATCH";
/// Output declared JSON but failed to parse as JSON.
pub const OUTPUT_CONTRACT_INVALID_JSON: &str = "FC_OUTPUT_CONTRACT_INVALID_JSON";
/// Output JSON is missing one or more schema-required fields.
pub const OUTPUT_CONTRACT_MISSING_FIELDS: &str = "FC_OUTPUT_CONTRACT_MISSING_FIELDS";
/// Output JSON does not match the declared schema.
pub const OUTPUT_CONTRACT_SCHEMA_MISMATCH: &str = "FC_OUTPUT_CONTRACT_SCHEMA_MISMATCH";

// ============================================================================
// SECTION: Side-Effects & Semantic
// ============================================================================

/// Predicted side-effect crosses the configured side-effect boundary.
pub const SIDE_EFFECT_BOUNDARY_CROSSED: &str = "SIDE_EFFECT_BOUNDARY_CROSSED";
/// Semantic guard rejected the call based on a structured-parse rule.
pub const SEMANTIC_VIOLATION: &str = "SEMANTIC_VIOLATION";

// ============================================================================
// SECTION: DLP & Taint
// ============================================================================

/// A sink call with tainted input was blocked to prevent data exfiltration.
pub const DATA_LEAK_PREVENTED: &str = "DATA_LEAK_PREVENTED";
/// Prefix for taint-flow codes; suffixed with the originating sensitivity.
pub const TAINT_FLOW_PREFIX: &str = "FC_TAINT_FLOW_";

/// Builds the sensitivity-specific taint-flow code, e.g. `FC_TAINT_FLOW_SECRET_TO_SINK`.
#[must_use]
pub fn taint_flow_code(sensitivity: &str) -> String {
    format!("{TAINT_FLOW_PREFIX}{}_TO_SINK", sensitivity.to_uppercase())
}

// ============================================================================
// SECTION: Replay
// ============================================================================

/// A replayed step's current fingerprint had no match in the historical trace.
pub const REPLAY_MISS: &str = "REPLAY_MISS";
/// Replay is operating in report mode, so no tool was executed.
pub const REPLAY_REPORT_MODE: &str = "REPLAY_REPORT_MODE";

// ============================================================================
// SECTION: Engine / Policy
// ============================================================================

/// A validator raised an internal error; synthesized into a blocking decision.
pub const ENGINE_VALIDATOR_ERROR: &str = "FC_ENGINE_VALIDATOR_ERROR";

/// Builds the exception-bypass allow code for a validator id, e.g.
/// `FC_EXCEPTION_SECURITY_PATH_TRAVERSAL`.
#[must_use]
pub fn exception_code(validator_id: &str) -> String {
    format!("FC_EXCEPTION_{}", validator_id.to_uppercase())
}
