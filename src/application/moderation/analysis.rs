//! Turns untyped analyzer output into verdicts.
//!
//! Malformed output never fails a batch: anything that is not a JSON array
//! with exactly one entry per input degrades to the fail-open verdict for
//! every item. Only transport, timeout and credential errors surface as `Err`.

use crate::domain::moderation::entity::{ModerationAction, ModerationResult, Severity};
use crate::infrastructure::ml::traits::{AnalyzerError, ContentAnalyzer};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_CONFIDENCE: f64 = 0.5;
const ALLOWED_REASON: &str = "Content approved";
const FLAGGED_REASON: &str = "Content flagged by analysis";

pub struct AnalysisEngine {
    analyzer: Arc<dyn ContentAnalyzer>,
}

impl AnalysisEngine {
    pub fn new(analyzer: Arc<dyn ContentAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// One verdict per input, in input order.
    pub async fn analyze(&self, contents: &[String]) -> Result<Vec<ModerationResult>, AnalyzerError> {
        if contents.is_empty() {
            return Ok(Vec::new());
        }
        let raw = self.analyzer.analyze_raw(contents).await?;
        Ok(normalize_batch(&raw, contents.len()))
    }
}

pub fn normalize_batch(raw: &Value, expected: usize) -> Vec<ModerationResult> {
    let entries = match raw {
        Value::Array(entries) => Some(entries),
        Value::Object(map) => map.get("results").and_then(Value::as_array),
        _ => None,
    };

    match entries {
        Some(entries) if entries.len() == expected => {
            debug!(count = expected, "analyzer output accepted");
            entries.iter().map(normalize_result).collect()
        }
        Some(entries) => {
            warn!(
                expected,
                received = entries.len(),
                "analyzer returned a mismatched batch, failing open"
            );
            vec![ModerationResult::ai_unavailable(); expected]
        }
        None => {
            warn!(expected, "analyzer returned non-array output, failing open");
            vec![ModerationResult::ai_unavailable(); expected]
        }
    }
}

/// Coerces one raw verdict object into a `ModerationResult`.
///
/// Unknown enum values fall back to the least disruptive choice, confidence
/// outside `[0, 1]` becomes 0.5, and the `allowed`/`action` pair is made
/// consistent: a disallowed verdict without a restrictive action escalates,
/// an allowed verdict carrying block or ban is downgraded to a warning.
pub fn normalize_result(value: &Value) -> ModerationResult {
    let Some(object) = value.as_object() else {
        return ModerationResult::ai_unavailable();
    };

    let mut action = object
        .get("action")
        .and_then(Value::as_str)
        .and_then(ModerationAction::parse)
        .unwrap_or(ModerationAction::Allow);

    let severity = object
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::parse)
        .unwrap_or(Severity::Low);

    let allowed = object
        .get("allowed")
        .and_then(Value::as_bool)
        .unwrap_or_else(|| !action.is_restrictive());

    if !allowed && !action.is_restrictive() {
        action = ModerationAction::Escalate;
    } else if allowed && action.is_account_level() {
        action = ModerationAction::Warn;
    }

    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .filter(|c| (0.0..=1.0).contains(c))
        .unwrap_or(DEFAULT_CONFIDENCE);

    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if allowed {
                ALLOWED_REASON.to_string()
            } else {
                FLAGGED_REASON.to_string()
            }
        });

    ModerationResult {
        allowed,
        severity,
        categories: normalize_categories(object.get("categories")),
        action,
        reason,
        confidence,
    }
}

fn normalize_categories(value: Option<&Value>) -> Vec<String> {
    let raw: Vec<&str> = match value {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        Some(Value::String(single)) => vec![single.as_str()],
        _ => Vec::new(),
    };

    let mut categories: Vec<String> = Vec::with_capacity(raw.len());
    for category in raw {
        let category = category.trim().to_lowercase();
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}
