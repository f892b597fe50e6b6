// system-tests/tests/drift.rs
// ============================================================================
// Module: Drift Scenario
// Description: a call suddenly targeting the cloud
//              metadata host after two ordinary calls is flagged as an
//              inflection point.
// ============================================================================

use fc_core::Timestamp;
use fc_replay::ChangeType;
use fc_replay::DriftConfig;
use fc_replay::DriftSeverity;
use fc_replay::InflectionTrigger;
use fc_replay::analyze_drift;
use fc_replay::inflection_points;
use serde_json::json;

fn snapshot(seq: u64, host: &str, callback_url: &str) -> fc_replay::CallSnapshot {
    let params = match json!({"host": host, "callback_url": callback_url}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    fc_replay::CallSnapshot { seq, ts: Timestamp::now(), tool: "http_request".to_string(), params }
}

#[test]
fn redirected_endpoint_is_flagged_as_inflection_point() {
    let snapshots = vec![
        snapshot(1, "api.stripe.com", "https://api.stripe.com/webhook"),
        snapshot(2, "api.stripe.com", "https://api.stripe.com/webhook"),
        snapshot(3, "169.254.169.254", "http://169.254.169.254/latest/meta-data/"),
    ];

    let config = DriftConfig::default();
    let points = analyze_drift(&snapshots, &config);
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].drift_delta, 0.0, "first snapshot is the baseline itself");
    assert_eq!(points[1].drift_delta, 0.0, "second call repeats the baseline exactly");

    let third = &points[2];
    assert!(third.drift_delta >= 10.0, "two endpoint fields changing domain should sum to >= 10, got {}", third.drift_delta);
    assert!(third.top_changes.iter().any(|change| change.change_type == ChangeType::DomainChanged && change.severity == DriftSeverity::High && change.field_path == "host"));

    let inflections = inflection_points(&points, &config);
    assert_eq!(inflections.len(), 1);
    assert_eq!(inflections[0].point.seq, 3);
    assert_eq!(inflections[0].trigger, InflectionTrigger::AbsoluteThreshold);
}

#[test]
fn steady_repeated_calls_never_flag_inflection() {
    let snapshots = vec![
        snapshot(1, "api.stripe.com", "https://api.stripe.com/webhook"),
        snapshot(2, "api.stripe.com", "https://api.stripe.com/webhook"),
        snapshot(3, "api.stripe.com", "https://api.stripe.com/webhook"),
        snapshot(4, "api.stripe.com", "https://api.stripe.com/webhook"),
    ];

    let config = DriftConfig::default();
    let points = analyze_drift(&snapshots, &config);
    let inflections = inflection_points(&points, &config);
    assert!(inflections.is_empty(), "no change across calls must never trigger an inflection point");
}
