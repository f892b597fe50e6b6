// fc-replay/src/drift.rs
// ============================================================================
// Module: Drift Engine
// Description: Post-run analysis of parameter drift across repeated calls to
//              the same tool.
// Purpose: Surface gradual or sudden parameter-shape changes that the
//          validators and semantic guard, evaluated per-call, cannot see.
// Dependencies: fc-core, url
// ============================================================================

//! ## Overview
//! Unlike replay, drift analysis runs after the fact over an entire trace: it
//! groups every `STEP_START` by tool, builds a per-tool baseline snapshot,
//! and measures each subsequent call's parameters against that baseline.
//! Differences are weighted (`value_changed` = 1, `magnitude_changed` = 2,
//! `domain_changed` = 5) and summed into a per-step `drift_delta`; deltas
//! accumulate into `drift_cumulative`. A step is an [`InflectionPoint`] when
//! its delta crosses an absolute threshold or is at least double the
//! previous step's delta.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use fc_core::Timestamp;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Weights and thresholds
// ============================================================================

const WEIGHT_VALUE_CHANGED: f64 = 1.0;
const WEIGHT_MAGNITUDE_CHANGED: f64 = 2.0;
const WEIGHT_DOMAIN_CHANGED: f64 = 5.0;

const MAGNITUDE_RATIO_MEDIUM: f64 = 5.0;
const MAGNITUDE_RATIO_HIGH: f64 = 20.0;

const DEFAULT_INFLECTION_ABSOLUTE_THRESHOLD: f64 = 10.0;

/// Field names dropped from drift comparison at the top level of a snapshot.
fn default_ignored_fields() -> BTreeSet<String> {
    ["request_id", "timestamp"].into_iter().map(str::to_string).collect()
}

/// Field names whose value is compared as a network endpoint rather than an
/// opaque scalar, even when it holds a bare hostname rather than a full URL.
fn is_endpoint_field(field_name: &str) -> bool {
    matches!(field_name, "host" | "hostname" | "domain" | "url" | "endpoint" | "uri")
}

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// How the "normal" snapshot for a tool is chosen before new calls are
/// measured against it.
#[derive(Debug, Clone, PartialEq)]
pub enum BaselineStrategy {
    /// The first recorded call, empty params included.
    FirstOccurrence,
    /// Per-field median across all recorded calls.
    Median,
    /// Per-field percentile (0.0-1.0) across all recorded calls.
    Percentile(f64),
    /// Per-segment median, segments delimited by inflection points.
    Segmented,
}

impl Default for BaselineStrategy {
    fn default() -> Self {
        BaselineStrategy::FirstOccurrence
    }
}

/// Tunables for [`analyze_drift`].
#[derive(Debug, Clone)]
pub struct DriftConfig {
    /// Top-level field names excluded from comparison.
    pub ignored_fields: BTreeSet<String>,
    /// Baseline construction strategy.
    pub baseline_strategy: BaselineStrategy,
    /// Absolute `drift_delta` that marks a step an inflection point.
    pub inflection_absolute_threshold: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            ignored_fields: default_ignored_fields(),
            baseline_strategy: BaselineStrategy::default(),
            inflection_absolute_threshold: DEFAULT_INFLECTION_ABSOLUTE_THRESHOLD,
        }
    }
}

// ============================================================================
// SECTION: Change classification
// ============================================================================

/// Kind of field-level change detected between a snapshot and its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// The value changed but neither magnitude nor domain crossed a
    /// threshold.
    ValueChanged,
    /// A numeric value changed by a large ratio.
    MagnitudeChanged,
    /// A network endpoint's host, scheme, or path root changed.
    DomainChanged,
}

/// Severity assigned to a single field change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftSeverity {
    /// Informational; does not itself raise concern.
    Low,
    /// Warrants attention.
    Medium,
    /// Likely to indicate a compromised or redirected call.
    High,
}

/// One field-level change contributing to a step's `drift_delta`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChangeEntry {
    /// Dot-separated path to the changed field (e.g. `"headers.host"`).
    pub field_path: String,
    /// Classification of the change.
    pub change_type: ChangeType,
    /// Value in the baseline snapshot.
    pub baseline_value: Value,
    /// Value in the current snapshot.
    pub current_value: Value,
    /// Severity of this change.
    pub severity: DriftSeverity,
    /// Human-readable reason, e.g. `"ratio 37.0x exceeds high threshold"`.
    pub reason: String,
}

// ============================================================================
// SECTION: Drift points
// ============================================================================

/// Drift measurement for a single call.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DriftPoint {
    /// Sequence number of the call's `STEP_START` event.
    pub seq: u64,
    /// Timestamp of the call.
    pub ts: Timestamp,
    /// Tool name.
    pub tool: String,
    /// Weighted sum of changes versus the baseline for this call.
    pub drift_delta: f64,
    /// Running sum of `drift_delta` across all calls to this tool so far.
    pub drift_cumulative: f64,
    /// Highest-severity changes, most significant first.
    pub top_changes: Vec<ChangeEntry>,
}

/// Why a [`DriftPoint`] was flagged as an inflection point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InflectionTrigger {
    /// `drift_delta` met or exceeded the configured absolute threshold.
    AbsoluteThreshold,
    /// `drift_delta` was at least double the previous step's delta.
    RelativeToPrevious,
}

/// A [`DriftPoint`] that crossed an inflection threshold.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InflectionPoint {
    /// The flagged point.
    pub point: DriftPoint,
    /// Why it was flagged.
    pub trigger: InflectionTrigger,
}

// ============================================================================
// SECTION: Snapshot input
// ============================================================================

/// One recorded call's parameter snapshot, as extracted from `STEP_START`.
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    /// Sequence number of the `STEP_START` event.
    pub seq: u64,
    /// Timestamp of the call.
    pub ts: Timestamp,
    /// Tool name.
    pub tool: String,
    /// Call parameters.
    pub params: Map<String, Value>,
}

// ============================================================================
// SECTION: Field diffing
// ============================================================================

/// Recursively diffs `current` against `baseline`, applying `ignored_fields`
/// only at `depth == 0` (nested fields of the same name are never ignored).
fn diff_values(path_prefix: &str, baseline: &Value, current: &Value, depth: usize, ignored_fields: &BTreeSet<String>, changes: &mut Vec<ChangeEntry>) {
    match (baseline, current) {
        (Value::Object(base_map), Value::Object(cur_map)) => {
            let mut keys: BTreeSet<&String> = base_map.keys().collect();
            keys.extend(cur_map.keys());
            for key in keys {
                if depth == 0 && ignored_fields.contains(key) {
                    continue;
                }
                let field_path = if path_prefix.is_empty() { key.clone() } else { format!("{path_prefix}.{key}") };
                let base_value = base_map.get(key).unwrap_or(&Value::Null);
                let cur_value = cur_map.get(key).unwrap_or(&Value::Null);
                diff_values(&field_path, base_value, cur_value, depth + 1, ignored_fields, changes);
            }
        }
        _ if baseline == current => {}
        _ => {
            if let Some(entry) = classify_field_change(path_prefix, baseline, current) {
                changes.push(entry);
            }
        }
    }
}

/// Classifies a single leaf-level (or type-mismatched) change.
fn classify_field_change(field_path: &str, baseline: &Value, current: &Value) -> Option<ChangeEntry> {
    let field_name = field_path.rsplit('.').next().unwrap_or(field_path);

    if is_endpoint_field(field_name) {
        if let Some(entry) = classify_domain_change(field_path, baseline, current) {
            return Some(entry);
        }
    }

    if let (Some(base_num), Some(cur_num)) = (as_f64(baseline), as_f64(current)) {
        if let Some(entry) = classify_magnitude_change(field_path, baseline, current, base_num, cur_num) {
            return Some(entry);
        }
    }

    Some(ChangeEntry {
        field_path: field_path.to_string(),
        change_type: ChangeType::ValueChanged,
        baseline_value: baseline.clone(),
        current_value: current.clone(),
        severity: DriftSeverity::Low,
        reason: "value changed".to_string(),
    })
}

fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn classify_magnitude_change(field_path: &str, baseline: &Value, current: &Value, base_num: f64, cur_num: f64) -> Option<ChangeEntry> {
    if base_num == 0.0 || cur_num == 0.0 {
        return None;
    }
    let ratio = (cur_num / base_num).abs().max((base_num / cur_num).abs());
    if ratio < MAGNITUDE_RATIO_MEDIUM {
        return None;
    }
    let severity = if ratio >= MAGNITUDE_RATIO_HIGH { DriftSeverity::High } else { DriftSeverity::Medium };
    Some(ChangeEntry {
        field_path: field_path.to_string(),
        change_type: ChangeType::MagnitudeChanged,
        baseline_value: baseline.clone(),
        current_value: current.clone(),
        severity,
        reason: format!("ratio {ratio:.1}x"),
    })
}

/// Extracts a host/scheme/path-root triple from either a bare hostname or a
/// full URL string.
fn endpoint_identity(value: &Value) -> Option<(Option<String>, Option<String>, Option<String>)> {
    let text = value.as_str()?;
    if let Ok(parsed) = url::Url::parse(text) {
        let scheme = Some(parsed.scheme().to_string());
        let host = parsed.host_str().map(str::to_string);
        let path_root = parsed.path().split('/').find(|segment| !segment.is_empty()).map(str::to_string);
        return Some((scheme, host, path_root));
    }
    Some((None, Some(text.to_string()), None))
}

fn classify_domain_change(field_path: &str, baseline: &Value, current: &Value) -> Option<ChangeEntry> {
    let (base_scheme, base_host, base_root) = endpoint_identity(baseline)?;
    let (cur_scheme, cur_host, cur_root) = endpoint_identity(current)?;

    if base_scheme == cur_scheme && base_host == cur_host && base_root == cur_root {
        return None;
    }

    Some(ChangeEntry {
        field_path: field_path.to_string(),
        change_type: ChangeType::DomainChanged,
        baseline_value: baseline.clone(),
        current_value: current.clone(),
        severity: DriftSeverity::High,
        reason: "host, scheme, or path root changed".to_string(),
    })
}

fn change_weight(change_type: ChangeType) -> f64 {
    match change_type {
        ChangeType::ValueChanged => WEIGHT_VALUE_CHANGED,
        ChangeType::MagnitudeChanged => WEIGHT_MAGNITUDE_CHANGED,
        ChangeType::DomainChanged => WEIGHT_DOMAIN_CHANGED,
    }
}

// ============================================================================
// SECTION: Baseline construction
// ============================================================================

fn build_baseline(strategy: &BaselineStrategy, snapshots: &[CallSnapshot], up_to: usize) -> Map<String, Value> {
    match strategy {
        BaselineStrategy::FirstOccurrence => snapshots.first().map(|snapshot| snapshot.params.clone()).unwrap_or_default(),
        BaselineStrategy::Median => median_baseline(snapshots, up_to, 0.5),
        BaselineStrategy::Percentile(p) => median_baseline(snapshots, up_to, *p),
        BaselineStrategy::Segmented => {
            // Segment boundary: the start of the run of snapshots since the
            // most recent inflection would normally delimit this, but a
            // post-hoc segmented baseline only has the snapshots seen so
            // far; fall back to the most recent snapshot as the segment's
            // representative until a full second pass is warranted.
            snapshots.get(up_to.saturating_sub(1)).map(|snapshot| snapshot.params.clone()).unwrap_or_default()
        }
    }
}

/// Per-field median (or percentile) across `snapshots[..=up_to]`'s numeric
/// fields; non-numeric fields fall back to the most common value.
fn median_baseline(snapshots: &[CallSnapshot], up_to: usize, percentile: f64) -> Map<String, Value> {
    let window = &snapshots[..=up_to.min(snapshots.len().saturating_sub(1))];
    let Some(first) = window.first() else { return Map::new() };

    let mut result = Map::new();
    for key in first.params.keys() {
        let mut numeric_values: Vec<f64> = Vec::new();
        let mut mode_counts: BTreeMap<String, usize> = BTreeMap::new();
        for snapshot in window {
            let Some(value) = snapshot.params.get(key) else { continue };
            if let Some(num) = value.as_f64() {
                numeric_values.push(num);
            } else {
                *mode_counts.entry(value.to_string()).or_insert(0) += 1;
            }
        }
        if !numeric_values.is_empty() {
            numeric_values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let index = ((numeric_values.len() as f64 - 1.0) * percentile.clamp(0.0, 1.0)).round() as usize;
            let picked = numeric_values[index.min(numeric_values.len() - 1)];
            result.insert(key.clone(), serde_json::json!(picked));
        } else if let Some((raw, _)) = mode_counts.into_iter().max_by_key(|(_, count)| *count) {
            if let Ok(value) = serde_json::from_str::<Value>(&raw) {
                result.insert(key.clone(), value);
            }
        }
    }
    result
}

// ============================================================================
// SECTION: Extracting snapshots from a trace
// ============================================================================

/// Extracts one [`CallSnapshot`] per `STEP_START` event, grouped by tool,
/// preserving trace order within each group.
#[must_use]
pub fn group_snapshots_by_tool(events: &[fc_core::TraceEvent]) -> BTreeMap<String, Vec<CallSnapshot>> {
    let mut grouped: BTreeMap<String, Vec<CallSnapshot>> = BTreeMap::new();
    for event in events {
        if event.event.event_type != fc_core::EventType::StepStart {
            continue;
        }
        let Some(step) = &event.event.step else { continue };
        let Some(tool) = step.get("tool").and_then(Value::as_str) else { continue };
        let params = event.event.data.get("params").and_then(Value::as_object).cloned().unwrap_or_default();
        grouped.entry(tool.to_string()).or_default().push(CallSnapshot { seq: event.seq, ts: event.ts, tool: tool.to_string(), params });
    }
    grouped
}

// ============================================================================
// SECTION: Analysis entry point
// ============================================================================

/// Computes a drift series for one tool's call history, in snapshot order.
#[must_use]
pub fn analyze_drift(snapshots: &[CallSnapshot], config: &DriftConfig) -> Vec<DriftPoint> {
    let mut points = Vec::with_capacity(snapshots.len());
    let mut cumulative = 0.0;

    for (index, snapshot) in snapshots.iter().enumerate() {
        if index == 0 {
            points.push(DriftPoint { seq: snapshot.seq, ts: snapshot.ts.clone(), tool: snapshot.tool.clone(), drift_delta: 0.0, drift_cumulative: 0.0, top_changes: Vec::new() });
            continue;
        }

        let baseline_index = match config.baseline_strategy {
            BaselineStrategy::FirstOccurrence => 0,
            _ => index - 1,
        };
        let baseline = build_baseline(&config.baseline_strategy, snapshots, baseline_index);

        let mut changes = Vec::new();
        diff_values("", &Value::Object(baseline), &Value::Object(snapshot.params.clone()), 0, &config.ignored_fields, &mut changes);
        changes.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| change_weight(b.change_type).partial_cmp(&change_weight(a.change_type)).unwrap_or(std::cmp::Ordering::Equal)));

        let delta: f64 = changes.iter().map(|change| change_weight(change.change_type)).sum();
        cumulative += delta;

        points.push(DriftPoint { seq: snapshot.seq, ts: snapshot.ts.clone(), tool: snapshot.tool.clone(), drift_delta: delta, drift_cumulative: cumulative, top_changes: changes });
    }

    points
}

/// Filters `points` down to the ones that qualify as inflection points under
/// `config`.
#[must_use]
pub fn inflection_points(points: &[DriftPoint], config: &DriftConfig) -> Vec<InflectionPoint> {
    let mut result = Vec::new();
    let mut previous_delta = 0.0;
    for point in points {
        if point.drift_delta >= config.inflection_absolute_threshold {
            result.push(InflectionPoint { point: point.clone(), trigger: InflectionTrigger::AbsoluteThreshold });
        } else if previous_delta > 0.0 && point.drift_delta >= 2.0 * previous_delta {
            result.push(InflectionPoint { point: point.clone(), trigger: InflectionTrigger::RelativeToPrevious });
        }
        previous_delta = point.drift_delta;
    }
    result
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]
mod tests {
    use super::*;

    fn snapshot(seq: u64, params: Value) -> CallSnapshot {
        let Value::Object(map) = params else { panic!("expected object") };
        CallSnapshot { seq, ts: Timestamp::now(), tool: "http_request".to_string(), params: map }
    }

    #[test]
    fn identical_snapshots_after_normalization_have_zero_delta() {
        let snapshots = vec![
            snapshot(1, serde_json::json!({"host": "api.stripe.com", "request_id": "a"})),
            snapshot(2, serde_json::json!({"host": "api.stripe.com", "request_id": "b"})),
        ];
        let config = DriftConfig::default();
        let points = analyze_drift(&snapshots, &config);
        assert_eq!(points[1].drift_delta, 0.0);
    }

    #[test]
    fn ignored_top_level_field_change_produces_no_drift() {
        let snapshots = vec![snapshot(1, serde_json::json!({"timestamp": "t1"})), snapshot(2, serde_json::json!({"timestamp": "t2"}))];
        let points = analyze_drift(&snapshots, &DriftConfig::default());
        assert_eq!(points[1].drift_delta, 0.0);
    }

    #[test]
    fn domain_change_on_bare_host_field_is_high_severity() {
        let snapshots = vec![
            snapshot(1, serde_json::json!({"host": "api.stripe.com", "path": "/v1/charges"})),
            snapshot(2, serde_json::json!({"host": "api.stripe.com", "path": "/v1/charges"})),
            snapshot(3, serde_json::json!({"host": "169.254.169.254", "path": "/v1/charges"})),
        ];
        let points = analyze_drift(&snapshots, &DriftConfig::default());
        let third = &points[2];
        assert!(third.drift_delta >= WEIGHT_DOMAIN_CHANGED);
        let domain_change = third.top_changes.iter().find(|change| change.change_type == ChangeType::DomainChanged).unwrap();
        assert_eq!(domain_change.field_path, "host");
        assert_eq!(domain_change.severity, DriftSeverity::High);

        let inflections = inflection_points(&points, &DriftConfig::default());
        assert!(inflections.iter().any(|inflection| inflection.point.seq == 3));
    }

    #[test]
    fn large_numeric_ratio_is_flagged_magnitude_changed() {
        let snapshots = vec![snapshot(1, serde_json::json!({"limit": 10})), snapshot(2, serde_json::json!({"limit": 500}))];
        let points = analyze_drift(&snapshots, &DriftConfig::default());
        let change = &points[1].top_changes[0];
        assert_eq!(change.change_type, ChangeType::MagnitudeChanged);
        assert_eq!(change.severity, DriftSeverity::High);
    }

    #[test]
    fn small_numeric_change_is_value_changed_only() {
        let snapshots = vec![snapshot(1, serde_json::json!({"limit": 10})), snapshot(2, serde_json::json!({"limit": 12}))];
        let points = analyze_drift(&snapshots, &DriftConfig::default());
        let change = &points[1].top_changes[0];
        assert_eq!(change.change_type, ChangeType::ValueChanged);
    }

    #[test]
    fn nested_field_with_ignored_top_level_name_is_still_compared() {
        let snapshots = vec![
            snapshot(1, serde_json::json!({"headers": {"request_id": "a"}})),
            snapshot(2, serde_json::json!({"headers": {"request_id": "b"}})),
        ];
        let points = analyze_drift(&snapshots, &DriftConfig::default());
        assert_eq!(points[1].drift_delta, WEIGHT_VALUE_CHANGED);
        assert_eq!(points[1].top_changes[0].field_path, "headers.request_id");
    }

    #[test]
    fn first_snapshot_is_always_baseline_with_zero_drift() {
        let snapshots = vec![snapshot(1, serde_json::json!({}))];
        let points = analyze_drift(&snapshots, &DriftConfig::default());
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].drift_delta, 0.0);
    }
}
