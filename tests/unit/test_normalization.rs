use moderation::application::moderation::analysis::{normalize_batch, normalize_result};
use moderation::domain::moderation::entity::{
    AI_UNAVAILABLE_REASON, ModerationAction, ModerationResult, Severity,
};
use serde_json::json;

#[test]
fn well_formed_verdict_passes_through() {
    let result = normalize_result(&json!({
        "allowed": false,
        "severity": "HIGH",
        "categories": ["Harassment", "harassment", "spam"],
        "action": "block",
        "reason": "Targeted insults",
        "confidence": 0.92
    }));
    assert!(!result.allowed);
    assert_eq!(result.severity, Severity::High);
    assert_eq!(result.action, ModerationAction::Block);
    assert_eq!(result.categories, vec!["harassment", "spam"]);
    assert_eq!(result.reason, "Targeted insults");
    assert_eq!(result.confidence, 0.92);
}

#[test]
fn disallowed_without_restrictive_action_escalates() {
    let result = normalize_result(&json!({ "allowed": false, "action": "warn" }));
    assert_eq!(result.action, ModerationAction::Escalate);
    assert_eq!(result.reason, "Content flagged by analysis");
}

#[test]
fn allowed_block_is_downgraded_to_warn() {
    let result = normalize_result(&json!({ "allowed": true, "action": "ban" }));
    assert!(result.allowed);
    assert_eq!(result.action, ModerationAction::Warn);
}

#[test]
fn unknown_values_take_least_disruptive_defaults() {
    let result = normalize_result(&json!({
        "action": "obliterate",
        "severity": "apocalyptic",
        "confidence": 7
    }));
    assert!(result.allowed);
    assert_eq!(result.action, ModerationAction::Allow);
    assert_eq!(result.severity, Severity::Low);
    assert_eq!(result.confidence, 0.5);
    assert_eq!(result.reason, "Content approved");
}

#[test]
fn missing_allowed_follows_action() {
    assert!(!normalize_result(&json!({ "action": "block" })).allowed);
    assert!(normalize_result(&json!({ "action": "warn" })).allowed);
}

#[test]
fn non_array_output_fails_open_for_every_item() {
    let results = normalize_batch(&json!("not json you were looking for"), 3);
    assert_eq!(results, vec![ModerationResult::ai_unavailable(); 3]);
    assert_eq!(results[0].reason, AI_UNAVAILABLE_REASON);
}

#[test]
fn length_mismatch_fails_open_for_every_item() {
    let raw = json!([{ "allowed": false, "action": "block" }]);
    let results = normalize_batch(&raw, 2);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.allowed && r.confidence == 0.5));
}

#[test]
fn results_wrapper_object_is_accepted() {
    let raw = json!({ "results": [{ "allowed": true, "action": "allow" }, { "allowed": false, "action": "block", "severity": "critical" }] });
    let results = normalize_batch(&raw, 2);
    assert!(results[0].allowed);
    assert_eq!(results[1].severity, Severity::Critical);
}
