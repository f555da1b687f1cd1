//! Synchronous submission-time filter.
//!
//! Runs before content is queued and never touches I/O. A failed pre-check
//! does not reject the submission by itself: the caller enqueues it at high
//! priority and the batch processor turns the failure into a local block
//! verdict without spending an analyzer call.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::domain::moderation::entity::{ModerationAction, ModerationResult, Severity};

pub const MAX_CONTENT_CHARS: usize = 5000;
pub const MAX_URLS: usize = 5;

pub const INAPPROPRIATE_LANGUAGE_REASON: &str = "Contains inappropriate language";
pub const TOO_LONG_REASON: &str = "Content too long";
pub const TOO_MANY_URLS_REASON: &str = "Too many URLs (possible spam)";

const BANNED_TERMS: &[&str] = &[
    "spam",
    "scam",
    "fraud",
    "fuck",
    "shit",
    "bitch",
    "asshole",
    "bastard",
    "cunt",
    "porn",
    "kill yourself",
];

lazy_static! {
    static ref URL_REGEX: Regex = Regex::new(r"(?i)https?://").unwrap();
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PrecheckRule {
    BannedTerm,
    TooLong,
    TooManyUrls,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct PrecheckOutcome {
    pub safe: bool,
    pub reason: Option<String>,
    pub rule: Option<PrecheckRule>,
}

impl PrecheckOutcome {
    fn safe() -> Self {
        Self {
            safe: true,
            reason: None,
            rule: None,
        }
    }

    fn unsafe_by(rule: PrecheckRule, reason: &str) -> Self {
        Self {
            safe: false,
            reason: Some(reason.to_string()),
            rule: Some(rule),
        }
    }

    /// Local verdict for a failed pre-check; `None` when the content passed.
    pub fn blocking_result(&self, categories: &PrecheckCategories) -> Option<ModerationResult> {
        let rule = self.rule?;
        Some(ModerationResult {
            allowed: false,
            severity: Severity::High,
            categories: vec![categories.for_rule(rule).to_string()],
            action: ModerationAction::Block,
            reason: self
                .reason
                .clone()
                .unwrap_or_else(|| INAPPROPRIATE_LANGUAGE_REASON.to_string()),
            confidence: 1.0,
        })
    }
}

/// Category tag attached to each rule's block verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecheckCategories {
    pub banned_term: String,
    pub too_long: String,
    pub too_many_urls: String,
}

impl Default for PrecheckCategories {
    fn default() -> Self {
        Self {
            banned_term: "harassment".to_string(),
            too_long: "spam".to_string(),
            too_many_urls: "spam".to_string(),
        }
    }
}

impl PrecheckCategories {
    pub fn for_rule(&self, rule: PrecheckRule) -> &str {
        match rule {
            PrecheckRule::BannedTerm => &self.banned_term,
            PrecheckRule::TooLong => &self.too_long,
            PrecheckRule::TooManyUrls => &self.too_many_urls,
        }
    }
}

fn contains_banned_term(content: &str) -> bool {
    let lowered = content.to_lowercase();
    BANNED_TERMS.iter().any(|term| lowered.contains(term))
}

pub fn count_urls(content: &str) -> usize {
    URL_REGEX.find_iter(content).count()
}

/// Rules run in order and the first match wins.
pub fn precheck(content: &str) -> PrecheckOutcome {
    if contains_banned_term(content) {
        return PrecheckOutcome::unsafe_by(PrecheckRule::BannedTerm, INAPPROPRIATE_LANGUAGE_REASON);
    }

    if content.chars().count() > MAX_CONTENT_CHARS {
        return PrecheckOutcome::unsafe_by(PrecheckRule::TooLong, TOO_LONG_REASON);
    }

    if count_urls(content) > MAX_URLS {
        return PrecheckOutcome::unsafe_by(PrecheckRule::TooManyUrls, TOO_MANY_URLS_REASON);
    }

    PrecheckOutcome::safe()
}
