use moderation::domain::moderation::entity::{ModerationAction, Severity};
use moderation::infrastructure::security::content_precheck::{
    PrecheckCategories, PrecheckRule, TOO_MANY_URLS_REASON, precheck,
};

#[test]
fn six_urls_fail_on_url_rule() {
    let outcome = precheck("buy now http://a http://b http://c http://d http://e http://f");
    assert!(!outcome.safe);
    assert_eq!(outcome.rule, Some(PrecheckRule::TooManyUrls));
    assert_eq!(outcome.reason.as_deref(), Some(TOO_MANY_URLS_REASON));

    let verdict = outcome
        .blocking_result(&PrecheckCategories::default())
        .expect("unsafe content should carry a verdict");
    assert_eq!(verdict.categories, vec!["spam".to_string()]);
}

#[test]
fn five_urls_are_still_safe() {
    let outcome = precheck("http://a https://b http://c HTTPS://d http://e");
    assert!(outcome.safe);
    assert!(outcome.blocking_result(&PrecheckCategories::default()).is_none());
}

#[test]
fn banned_term_blocks_with_high_severity() {
    let outcome = precheck("scam alert");
    assert!(!outcome.safe);
    assert_eq!(outcome.reason.as_deref(), Some("Contains inappropriate language"));

    let verdict = outcome
        .blocking_result(&PrecheckCategories::default())
        .expect("unsafe content should carry a verdict");
    assert!(!verdict.allowed);
    assert_eq!(verdict.action, ModerationAction::Block);
    assert_eq!(verdict.severity, Severity::High);
    assert_eq!(verdict.confidence, 1.0);
    assert_eq!(verdict.categories, vec!["harassment".to_string()]);
}

#[test]
fn banned_term_match_ignores_case() {
    assert!(!precheck("This is a SCAM").safe);
}

#[test]
fn keyword_rule_wins_over_length() {
    let content = format!("spam {}", "x".repeat(6000));
    assert_eq!(precheck(&content).rule, Some(PrecheckRule::BannedTerm));
}

#[test]
fn length_counts_characters_not_bytes() {
    assert!(precheck(&"é".repeat(5000)).safe);
    assert_eq!(precheck(&"é".repeat(5001)).rule, Some(PrecheckRule::TooLong));
}

#[test]
fn keyword_category_is_configurable() {
    let categories = PrecheckCategories {
        banned_term: "profanity".to_string(),
        ..PrecheckCategories::default()
    };
    let verdict = precheck("what a scam")
        .blocking_result(&categories)
        .expect("unsafe content should carry a verdict");
    assert_eq!(verdict.categories, vec!["profanity".to_string()]);
}
