// fc-core/src/model.rs
// ============================================================================
// Module: FailCore Data Model
// Description: Step, Context, Policy, Decision, and StepResult types.
// Purpose: Provide the canonical, serializable schema shared by every stage.
// Dependencies: crate::{identifiers, time}, serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines the types a caller constructs (`Step`), the snapshot
//! a validator evaluates (`Context`), the policy document that configures
//! validators (`Policy`), the verdict a validator returns (`Decision`), and
//! the terminal outcome the pipeline returns (`StepResult`). These types
//! are the single source of truth consumed by the validation engine,
//! semantic guard, taint engine, trace writer, and replay/drift engine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identifiers::RunId;
use crate::identifiers::SessionId;
use crate::identifiers::StepId;
use crate::identifiers::TraceId;
use crate::time::Timestamp;

// ============================================================================
// SECTION: Step
// ============================================================================

/// The unit of execution submitted by a caller or adapter.
///
/// # Invariants
/// - `id` and `tool` are non-empty.
/// - `params` keys are non-empty strings; values are JSON-compatible.
/// - Immutable once submitted: the pipeline never mutates a `Step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Stable identifier for this step, unique within its run.
    pub id: StepId,
    /// Name of the tool to invoke.
    pub tool: String,
    /// Parameter mapping passed to the tool.
    pub params: serde_json::Map<String, Value>,
    /// Step ids this step declares a data dependency on.
    #[serde(default)]
    pub depends_on: Vec<StepId>,
    /// Declared output contract, if any.
    #[serde(default)]
    pub expected_output: Option<OutputContract>,
    /// Attempt counter; incremented each time this step id is resubmitted.
    #[serde(default)]
    pub attempt: u32,
}

impl Step {
    /// Creates a new step with no dependencies, no output contract, and
    /// attempt zero.
    #[must_use]
    pub fn new(id: impl Into<StepId>, tool: impl Into<String>, params: serde_json::Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            params,
            depends_on: Vec::new(),
            expected_output: None,
            attempt: 0,
        }
    }

    /// Returns `true` when the step passes basic structural validation:
    /// non-empty id, non-empty tool, and (trivially) a well-formed params
    /// map, since `serde_json::Map` keys are always strings.
    #[must_use]
    pub fn is_structurally_valid(&self) -> bool {
        !self.id.as_str().is_empty()
            && !self.tool.is_empty()
            && self.params.keys().all(|key| !key.is_empty())
    }
}

/// A declared output contract for a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputContract {
    /// Expected output kind.
    pub expected_kind: StepOutputKind,
    /// Optional JSON Schema (Draft-7 subset) the output must satisfy.
    #[serde(default)]
    pub schema: Option<Value>,
    /// When `true`, a contract mismatch blocks instead of warning.
    #[serde(default)]
    pub strict: bool,
}

// ============================================================================
// SECTION: Context
// ============================================================================

/// Serializable snapshot of one step evaluated by the validation engine.
///
/// # Invariants
/// - `metadata` keys under [`crate::SYSTEM_METADATA_PREFIX`] are reserved
///   for the pipeline; validators read them but must not write them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Tool name under evaluation.
    pub tool: String,
    /// Parameters passed to the tool.
    pub params: serde_json::Map<String, Value>,
    /// Observed result, present only for post-execution validators.
    #[serde(default)]
    pub result: Option<StepOutput>,
    /// The step's declared output contract, if any, so post-execution
    /// validators (`output_contract`) and the pipeline's Output Contract
    /// stage share one source of truth instead of re-deriving it.
    #[serde(default)]
    pub expected_output: Option<OutputContract>,
    /// Step identifier this context was built for.
    pub step_id: StepId,
    /// Caller-supplied session identifier.
    #[serde(default)]
    pub session_id: Option<SessionId>,
    /// Extensible state shared across steps within a run (taint tags,
    /// dependency graph entries, and similar cross-step bookkeeping).
    #[serde(default)]
    pub state: BTreeMap<String, Value>,
    /// System and caller metadata. System keys use the
    /// `failcore.sys.*` namespace.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl Context {
    /// Returns a system metadata value by its fully-qualified key.
    #[must_use]
    pub fn system_meta(&self, key: &str) -> Option<&Value> {
        debug_assert!(key.starts_with(crate::SYSTEM_METADATA_PREFIX));
        self.metadata.get(key)
    }

    /// Returns the sandbox root in priority order: metadata, then state.
    /// Validators fall back to their own config and finally `cwd` beyond
    /// what this helper returns.
    #[must_use]
    pub fn sandbox_root_hint(&self) -> Option<&str> {
        self.metadata
            .get(crate::meta_keys::SANDBOX_ROOT)
            .or_else(|| self.state.get("sandbox_root"))
            .and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Per-validator enforcement mode.
///
/// # Invariants
/// - `Shadow` and `Warn` both downgrade `Block` to `Warn`; only `Block`
///   enforcement lets a blocking decision reach the pipeline unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    /// Decisions are computed and recorded but never change behavior.
    Shadow,
    /// Blocking decisions are downgraded to warnings.
    Warn,
    /// Blocking decisions are enforced.
    Block,
}

/// A time-limited exception bypassing one validator for a scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    /// Stable identifier for this exception, used in the bypass code.
    pub rule_id: String,
    /// Human-readable justification.
    pub reason: String,
    /// Expiry timestamp; missing or past means the exception is inactive
    /// (exceptions fail closed relative to the engine's `current_time`).
    pub expires_at: Option<Timestamp>,
    /// Optional scope restricting which tool/param this exception covers.
    #[serde(default)]
    pub scope: Option<ExceptionScope>,
    /// Optional identity of whoever created the exception.
    #[serde(default)]
    pub created_by: Option<String>,
    /// Optional creation timestamp.
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// Scope restricting an [`Exception`] to a tool and, optionally, a param.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionScope {
    /// Tool name the exception applies to.
    pub tool: String,
    /// Optional parameter name the exception applies to.
    #[serde(default)]
    pub param: Option<String>,
}

/// Per-validator configuration within a [`Policy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Whether this validator participates in evaluation.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Enforcement mode for this validator's decisions.
    #[serde(default = "default_enforcement")]
    pub enforcement: EnforcementMode,
    /// Domain used for priority ordering and dedup precedence.
    pub domain: String,
    /// Explicit priority; lower runs first within the same domain tier.
    #[serde(default)]
    pub priority: i32,
    /// Validator-specific configuration bag.
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
    /// Time-limited exceptions for this validator.
    #[serde(default)]
    pub exceptions: Vec<Exception>,
    /// Whether break-glass override may downgrade this validator's blocks.
    #[serde(default)]
    pub allow_override: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_enforcement() -> EnforcementMode {
    EnforcementMode::Block
}

/// Global break-glass override configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalOverride {
    /// Whether break-glass override is enabled at all.
    #[serde(default)]
    pub enabled: bool,
    /// Whether presenting a token is required to activate the override.
    #[serde(default = "default_true")]
    pub require_token: bool,
    /// Environment variable name carrying the override token.
    #[serde(default = "default_override_env_var")]
    pub token_env_var: String,
    /// Optional expiry after which the override stops applying.
    #[serde(default)]
    pub expires_at: Option<Timestamp>,
}

fn default_override_env_var() -> String {
    "FAILCORE_OVERRIDE_TOKEN".to_string()
}

impl Default for GlobalOverride {
    fn default() -> Self {
        Self {
            enabled: false,
            require_token: true,
            token_env_var: default_override_env_var(),
            expires_at: None,
        }
    }
}

/// Versioned, layered policy document.
///
/// # Invariants
/// - `load(dump(p))` is meaning-equal to `p` for any policy with
///   canonical field order (see `fc-policy` round-trip tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Schema version string, e.g. `"v1"`.
    #[serde(default = "default_policy_version")]
    pub version: String,
    /// Per-validator configuration, keyed by validator id.
    #[serde(default)]
    pub validators: BTreeMap<String, ValidatorConfig>,
    /// Global break-glass override configuration.
    #[serde(default)]
    pub global_override: GlobalOverride,
    /// Free-form metadata carried through round-trips unmodified.
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

fn default_policy_version() -> String {
    "v1".to_string()
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            version: default_policy_version(),
            validators: BTreeMap::new(),
            global_override: GlobalOverride::default(),
            metadata: BTreeMap::new(),
        }
    }
}

impl Policy {
    /// Returns the configuration for a validator id, if present.
    #[must_use]
    pub fn validator_config(&self, id: &str) -> Option<&ValidatorConfig> {
        self.validators.get(id)
    }

    /// Returns `true` when the policy has no validator entries at all, in
    /// which case the validation engine treats every registered validator
    /// as enabled by default.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

// ============================================================================
// SECTION: Decision
// ============================================================================

/// Outcome of a single validator's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Call is explicitly permitted.
    Allow,
    /// Call proceeds but the decision is recorded as a warning.
    Warn,
    /// Call is denied.
    Block,
}

/// Severity of a decision's underlying risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Informational; no real risk.
    Info,
    /// Low risk.
    Low,
    /// Medium risk.
    Medium,
    /// High risk.
    High,
    /// Critical risk.
    Critical,
}

/// Suggested remediation for a blocking or warning decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Remediation {
    /// Short, human-actionable suggestion.
    pub suggestion: String,
    /// Optional documentation or policy reference.
    #[serde(default)]
    pub reference: Option<String>,
}

/// A single validator's verdict for one [`Context`].
///
/// # Invariants
/// - `code` is append-only / immutable in meaning once published; see
///   [`crate::codes`] for the stable constant set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Allow, warn, or block.
    pub outcome: DecisionOutcome,
    /// Stable code of the shape `FC_{DOMAIN}_{CATEGORY}_{SPECIFIC}`.
    pub code: String,
    /// Identifier of the validator that produced this decision.
    pub validator_id: String,
    /// Optional rule identifier within the validator (semantic guard rules).
    #[serde(default)]
    pub rule_id: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Structured evidence supporting the decision.
    #[serde(default)]
    pub evidence: BTreeMap<String, Value>,
    /// Risk level of the underlying issue.
    #[serde(default = "default_risk_level")]
    pub risk_level: RiskLevel,
    /// Confidence in `[0.0, 1.0]`.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Whether break-glass override may downgrade this decision.
    #[serde(default)]
    pub overrideable: bool,
    /// Whether this decision requires a human approval step.
    #[serde(default)]
    pub requires_approval: bool,
    /// Free-form tags for filtering and display.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Suggested remediation, if any.
    #[serde(default)]
    pub remediation: Option<Remediation>,
    /// Tool this decision concerns, if available.
    #[serde(default)]
    pub tool: Option<String>,
    /// Step id this decision concerns, if available.
    #[serde(default)]
    pub step_id: Option<StepId>,
    /// Set when a decision was suppressed by deduplication and points at
    /// the surviving primary decision's code.
    #[serde(default)]
    pub suppressed_by: Option<String>,
}

const fn default_risk_level() -> RiskLevel {
    RiskLevel::Medium
}

const fn default_confidence() -> f64 {
    1.0
}

impl Decision {
    /// Builds an `allow` decision.
    #[must_use]
    pub fn allow(code: impl Into<String>, validator_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DecisionOutcome::Allow, code, validator_id, message)
    }

    /// Builds a `warn` decision.
    #[must_use]
    pub fn warn(code: impl Into<String>, validator_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DecisionOutcome::Warn, code, validator_id, message)
    }

    /// Builds a `block` decision with [`RiskLevel::High`] by default.
    #[must_use]
    pub fn block(code: impl Into<String>, validator_id: impl Into<String>, message: impl Into<String>) -> Self {
        let mut decision = Self::new(DecisionOutcome::Block, code, validator_id, message);
        decision.risk_level = RiskLevel::High;
        decision
    }

    fn new(outcome: DecisionOutcome, code: impl Into<String>, validator_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            outcome,
            code: code.into(),
            validator_id: validator_id.into(),
            rule_id: None,
            message: message.into(),
            evidence: BTreeMap::new(),
            risk_level: default_risk_level(),
            confidence: default_confidence(),
            overrideable: false,
            requires_approval: false,
            tags: Vec::new(),
            remediation: None,
            tool: None,
            step_id: None,
            suppressed_by: None,
        }
    }

    /// Attaches a single evidence field, returning `self` for chaining.
    #[must_use]
    pub fn with_evidence(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.evidence.insert(key.into(), value.into());
        self
    }

    /// Sets the risk level, returning `self` for chaining.
    #[must_use]
    pub const fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk_level = risk;
        self
    }

    /// Sets the remediation suggestion, returning `self` for chaining.
    #[must_use]
    pub fn with_remediation(mut self, suggestion: impl Into<String>) -> Self {
        self.remediation = Some(Remediation {
            suggestion: suggestion.into(),
            reference: None,
        });
        self
    }

    /// Returns `true` when this decision currently blocks execution.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(self.outcome, DecisionOutcome::Block)
    }
}

// ============================================================================
// SECTION: Step Output
// ============================================================================

/// The observed kind of a step's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutputKind {
    /// Structured JSON value.
    Json,
    /// Plain text.
    Text,
    /// Opaque byte payload.
    Bytes,
    /// One or more artifact references.
    Artifacts,
    /// Kind could not be determined.
    Unknown,
}

/// Observed output of a step.
///
/// # Invariants
/// - `kind` reflects what was observed, never what was declared; a
///   mismatch with a step's `expected_output` is surfaced via an
///   `OUTPUT_NORMALIZED` trace event, never a silent reshape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    /// Observed kind.
    pub kind: StepOutputKind,
    /// JSON or text value, when applicable.
    #[serde(default)]
    pub value: Option<Value>,
    /// Byte length and content-type hint, used instead of raw bytes so
    /// trace evidence never carries arbitrary binary payloads.
    #[serde(default)]
    pub bytes_len: Option<usize>,
    /// Content-type hint for byte payloads.
    #[serde(default)]
    pub content_type: Option<String>,
    /// Runpack-relative artifact references, for `Artifacts` outputs.
    #[serde(default)]
    pub artifacts: Vec<String>,
}

impl StepOutput {
    /// Wraps a JSON value as a `Json`-kind output.
    #[must_use]
    pub fn json(value: Value) -> Self {
        Self {
            kind: StepOutputKind::Json,
            value: Some(value),
            bytes_len: None,
            content_type: None,
            artifacts: Vec::new(),
        }
    }

    /// Wraps a string as a `Text`-kind output.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: StepOutputKind::Text,
            value: Some(Value::String(value.into())),
            bytes_len: None,
            content_type: None,
            artifacts: Vec::new(),
        }
    }

    /// Wraps a byte length as a `Bytes`-kind output.
    #[must_use]
    pub fn bytes(len: usize, content_type: Option<String>) -> Self {
        Self {
            kind: StepOutputKind::Bytes,
            value: None,
            bytes_len: Some(len),
            content_type,
            artifacts: Vec::new(),
        }
    }

    /// Returns a short text summary suitable for drift/taint pattern scans.
    #[must_use]
    pub fn summarize_text(&self) -> String {
        match &self.value {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => match self.content_type.as_deref() {
                Some(ct) => format!("<{} bytes: {ct}>", self.bytes_len.unwrap_or(0)),
                None => String::new(),
            },
        }
    }
}

// ============================================================================
// SECTION: Step Result
// ============================================================================

/// Terminal status of a step's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Step executed successfully.
    Ok,
    /// Step failed for a structural, dispatch, or tool-raised reason.
    Fail,
    /// Step was denied by policy, side-effect boundary, or semantic guard.
    Blocked,
    /// Step was not executed (replay report mode).
    Skipped,
    /// Step's output was injected from a historical trace by the replayer.
    Replayed,
}

/// Structured error detail for a non-OK [`StepResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    /// Stable error/decision code.
    pub code: String,
    /// Human-readable message, truncated if it exceeded the configured
    /// summarize limit (the truncation suffix notes the cut size).
    pub message: String,
    /// Structured detail map (evidence, remediation hints).
    #[serde(default)]
    pub detail: BTreeMap<String, Value>,
}

impl StepError {
    /// Builds a [`StepError`], truncating `message` to `max_len` bytes and
    /// appending a `"... (N bytes truncated)"` suffix when it was cut.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>, max_len: usize) -> Self {
        let raw = message.into();
        let message = truncate_with_suffix(&raw, max_len);
        Self {
            code: code.into(),
            message,
            detail: BTreeMap::new(),
        }
    }

    /// Attaches a single detail field, returning `self` for chaining.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }
}

/// Truncates `text` to `max_len` bytes on a UTF-8 boundary, appending a
/// suffix noting how many bytes were cut.
#[must_use]
pub fn truncate_with_suffix(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut cut = max_len;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let removed = text.len() - cut;
    format!("{}... ({removed} bytes truncated)", &text[..cut])
}

/// Final outcome of running one [`Step`] through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step identifier.
    pub step_id: StepId,
    /// Tool name.
    pub tool: String,
    /// Terminal status.
    pub status: StepStatus,
    /// Time the step began processing.
    pub started_at: Timestamp,
    /// Time the step finished processing.
    pub finished_at: Timestamp,
    /// Wall-clock duration in milliseconds, derived from the two timestamps.
    pub duration_ms: i64,
    /// Output, present when `status` is `Ok`, `Replayed`, or occasionally
    /// `Skipped` (replay report mode with a cached preview).
    #[serde(default)]
    pub output: Option<StepOutput>,
    /// Error detail, present when `status` is `Fail`, `Blocked`, or
    /// `Skipped` for a non-replay reason.
    #[serde(default)]
    pub error: Option<StepError>,
    /// Pipeline phase the terminal outcome was produced in
    /// (`validate`, `policy`, `semantic`, `replay`, `dispatch`, `contract`).
    pub phase: String,
    /// Attempt counter echoed from the submitted step.
    pub attempt: u32,
}

impl StepResult {
    /// Returns `true` when the result represents a successful execution
    /// (including a replayed one).
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        matches!(self.status, StepStatus::Ok | StepStatus::Replayed)
    }
}

// ============================================================================
// SECTION: Side-Effects
// ============================================================================

/// Categorized, observable side-effect of a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectType {
    /// Filesystem read.
    FilesystemRead,
    /// Filesystem write.
    FilesystemWrite,
    /// Filesystem delete.
    FilesystemDelete,
    /// Outbound network call.
    NetworkEgress,
    /// Inbound network exposure (e.g. binding a listener).
    NetworkIngress,
    /// Network call targeting a private/internal address.
    NetworkPrivate,
    /// Spawned a named command.
    ExecCommand,
    /// Spawned a subprocess.
    ExecSubprocess,
    /// Executed an interpreted script.
    ExecScript,
}

// ============================================================================
// SECTION: Taint
// ============================================================================

/// Sensitivity lattice for tainted data, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSensitivity {
    /// Not sensitive.
    Public,
    /// Internal-only, not regulated.
    Internal,
    /// Confidential business data.
    Confidential,
    /// Personally identifiable information.
    Pii,
    /// Secrets: keys, tokens, credentials.
    Secret,
}

/// A taint label attached to a step's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaintTag {
    /// Sensitivity of the tainted data.
    pub sensitivity: DataSensitivity,
    /// Human-readable source description (detector id, field name).
    pub source: String,
    /// Tool that produced the tainted output.
    pub source_tool: String,
    /// Step id that produced the tainted output.
    pub source_step_id: StepId,
    /// Number of propagation hops from the original source.
    pub propagation_depth: u32,
}

impl TaintTag {
    /// Creates a tag at the origin (`propagation_depth == 0`).
    #[must_use]
    pub fn origin(sensitivity: DataSensitivity, source: impl Into<String>, source_tool: impl Into<String>, source_step_id: StepId) -> Self {
        Self {
            sensitivity,
            source: source.into(),
            source_tool: source_tool.into(),
            source_step_id,
            propagation_depth: 0,
        }
    }

    /// Returns a copy of this tag propagated one hop deeper.
    #[must_use]
    pub fn propagated(&self) -> Self {
        Self {
            sensitivity: self.sensitivity,
            source: self.source.clone(),
            source_tool: self.source_tool.clone(),
            source_step_id: self.source_step_id.clone(),
            propagation_depth: self.propagation_depth + 1,
        }
    }
}

// ============================================================================
// SECTION: Run Context Identity
// ============================================================================

/// Identity fields every trace event's `run` block carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// Run identifier.
    pub run_id: RunId,
    /// Trace identifier for this run's event stream.
    pub trace_id: TraceId,
    /// Time the run was opened.
    pub created_at: Timestamp,
    /// Sandbox root directory for this run.
    pub sandbox_root: String,
    /// Free-form tags attached at run creation.
    #[serde(default)]
    pub tags: Vec<String>,
}

// ============================================================================
// SECTION: Trace Events
// ============================================================================

/// Current trace schema version stamped on every [`TraceEvent`].
/// Versioning is append-only: new event types and optional fields may be
/// added, but a published field's meaning never changes.
pub const TRACE_SCHEMA_VERSION: &str = "failcore.trace.v0.1.3";

/// Trace event type, `EventType` in the on-disk schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Run opened.
    RunStart,
    /// Run closed.
    RunEnd,
    /// Step entered the pipeline.
    StepStart,
    /// Step left the pipeline with a terminal [`StepStatus`].
    StepEnd,
    /// A step's fingerprint was computed.
    FingerprintComputed,
    /// A validator produced a non-allow decision that did not block.
    ValidationFailed,
    /// A validator's blocking decision denied the step.
    PolicyDenied,
    /// Observed output kind differed from the declared contract.
    OutputNormalized,
    /// An artifact was written to the run's artifact store.
    ArtifactWritten,
    /// A predicted side-effect was applied (or would have been, in shadow mode).
    SideEffectApplied,
    /// Replay found a fingerprint match.
    ReplayStepHit,
    /// Replay found no fingerprint match.
    ReplayStepMiss,
    /// Replay found a fingerprint match but policy decisions differ.
    ReplayPolicyDiff,
    /// Replay found a fingerprint match but output differs.
    ReplayOutputDiff,
    /// Replay substituted a historical output for the current call.
    ReplayInjected,
    /// One dispatch attempt of a step (retry bookkeeping).
    Attempt,
    /// Terminal per-step result summary.
    Result,
    /// One leg of proxied upstream traffic.
    EgressEvent,
}

/// Trace event severity, independent of [`DecisionOutcome`]/[`RiskLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Fine-grained internal detail.
    Debug,
    /// Normal operational event.
    Info,
    /// Recorded but non-blocking anomaly.
    Warn,
    /// Failure or blocking anomaly.
    Error,
}

/// The `event` block of a [`TraceEvent`]: a type tag plus optional
/// step-scoping and free-form structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    /// Discriminates what this event records.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Step this event concerns, if any, keyed the same way across
    /// every event type that names a step (id, tool, attempt).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Value>,
    /// Event-type-specific structured payload.
    #[serde(default)]
    pub data: Value,
}

impl EventBody {
    /// Builds an event body with no step scoping and `data = null`.
    #[must_use]
    pub fn new(event_type: EventType) -> Self {
        Self { event_type, step: None, data: Value::Null }
    }

    /// Attaches step-scoping, returning `self` for chaining.
    #[must_use]
    pub fn with_step(mut self, step: Value) -> Self {
        self.step = Some(step);
        self
    }

    /// Attaches a structured data payload, returning `self` for chaining.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// One line of the append-only JSONL trace file.
///
/// # Invariants
/// - `seq` is monotonic and gap-free within one run, starting at 1.
/// - `schema` is [`TRACE_SCHEMA_VERSION`] for events this crate emits;
///   readers must tolerate other values and unknown fields (forward
///   compatibility).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Schema version stamp.
    pub schema: String,
    /// Monotonic sequence number within the run, starting at 1.
    pub seq: u64,
    /// Event timestamp.
    pub ts: Timestamp,
    /// Event severity.
    pub level: LogLevel,
    /// Run identity this event belongs to.
    pub run: RunIdentity,
    /// Event type tag plus structured payload.
    pub event: EventBody,
    /// Optional host/process info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<Value>,
    /// Optional actor (caller identity) info.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Value>,
    /// Optional nested trace-correlation info (e.g. parent span).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<Value>,
    /// Optional security-relevant annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<Value>,
}

impl TraceEvent {
    /// Builds a [`TraceEvent`] stamped with the current [`TRACE_SCHEMA_VERSION`].
    #[must_use]
    pub fn new(seq: u64, ts: Timestamp, level: LogLevel, run: RunIdentity, event: EventBody) -> Self {
        Self {
            schema: TRACE_SCHEMA_VERSION.to_string(),
            seq,
            ts,
            level,
            run,
            event,
            host: None,
            actor: None,
            trace: None,
            security: None,
        }
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
    use super::*;

    #[test]
    fn truncation_appends_suffix_when_cut() {
        let long = "a".repeat(100);
        let truncated = truncate_with_suffix(&long, 10);
        assert!(truncated.starts_with("aaaaaaaaaa"));
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn truncation_is_noop_when_short() {
        let short = "hello";
        assert_eq!(truncate_with_suffix(short, 10), "hello");
    }

    #[test]
    fn structural_validity_rejects_empty_keys() {
        let mut params = serde_json::Map::new();
        params.insert(String::new(), Value::Bool(true));
        let step = Step::new("s1", "tool", params);
        assert!(!step.is_structurally_valid());
    }

    #[test]
    fn policy_empty_means_all_enabled() {
        let policy = Policy::default();
        assert!(policy.is_empty());
    }

    #[test]
    fn decision_block_defaults_to_high_risk() {
        let decision = Decision::block("FC_X", "v", "msg");
        assert_eq!(decision.risk_level, RiskLevel::High);
        assert!(decision.is_blocking());
    }

    #[test]
    fn event_type_serializes_to_screaming_snake_case() {
        let value = serde_json::to_value(EventType::PolicyDenied).unwrap();
        assert_eq!(value, serde_json::json!("POLICY_DENIED"));
        let value = serde_json::to_value(EventType::FingerprintComputed).unwrap();
        assert_eq!(value, serde_json::json!("FINGERPRINT_COMPUTED"));
    }

    #[test]
    fn trace_event_round_trips_through_json() {
        let run = RunIdentity {
            run_id: RunId::new("r1"),
            trace_id: TraceId::new("t1"),
            created_at: Timestamp::now(),
            sandbox_root: "/tmp/run".to_string(),
            tags: vec!["demo".to_string()],
        };
        let event = TraceEvent::new(1, Timestamp::now(), LogLevel::Info, run, EventBody::new(EventType::RunStart));
        let json = serde_json::to_string(&event).unwrap();
        let parsed: TraceEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.seq, 1);
        assert_eq!(parsed.schema, TRACE_SCHEMA_VERSION);
        assert_eq!(parsed.event.event_type, EventType::RunStart);
    }
}
