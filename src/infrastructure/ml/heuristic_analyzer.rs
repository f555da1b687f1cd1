//! Lexicon-scoring analyzer used when no model endpoint is configured.
//!
//! Emits the same raw JSON shape a model would, so its output goes through
//! the same normalization as remote verdicts.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::traits::{AnalyzerError, ContentAnalyzer};

struct CategoryTerms {
    category: &'static str,
    terms: &'static [&'static str],
    score_each: i32,
}

const CATEGORIES: &[CategoryTerms] = &[
    CategoryTerms {
        category: "hate_speech",
        terms: &["hate speech", "genocide", "lynch", "subhuman"],
        score_each: 90,
    },
    CategoryTerms {
        category: "violence",
        terms: &["kill you", "shoot you", "bomb", "terrorist"],
        score_each: 80,
    },
    CategoryTerms {
        category: "self_harm",
        terms: &["suicide", "self harm", "hurt yourself", "end your life", "kill yourself"],
        score_each: 80,
    },
    CategoryTerms {
        category: "explicit",
        terms: &["nude", "naked", "porn", "sext", "onlyfans"],
        score_each: 55,
    },
    CategoryTerms {
        category: "scam",
        terms: &[
            "wire transfer",
            "guaranteed returns",
            "crypto giveaway",
            "send your password",
            "gift card",
        ],
        score_each: 50,
    },
    CategoryTerms {
        category: "spam",
        terms: &["buy now", "free money", "click here", "whatsapp me", "telegram"],
        score_each: 40,
    },
    CategoryTerms {
        category: "harassment",
        terms: &["idiot", "stupid", "moron", "loser", "shut up", "dumb", "trash"],
        score_each: 35,
    },
];

fn normalize_text(input: &str) -> String {
    let mut normalized = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_alphanumeric() || ch.is_whitespace() {
            normalized.extend(ch.to_lowercase());
        } else {
            normalized.push(' ');
        }
    }
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn term_hit(normalized: &str, tokens: &[&str], term: &str) -> bool {
    if term.contains(' ') {
        normalized.contains(term)
    } else {
        tokens.iter().any(|token| *token == term)
    }
}

#[derive(Debug, Default)]
struct Assessment {
    score: i32,
    categories: Vec<&'static str>,
    matches: Vec<String>,
}

fn assess(content: &str) -> Assessment {
    let normalized = normalize_text(content);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let mut assessment = Assessment::default();

    for group in CATEGORIES {
        for term in group.terms {
            if term_hit(&normalized, &tokens, term) {
                assessment.score += group.score_each;
                assessment.matches.push(format!("{}:{}", group.category, term));
                if !assessment.categories.contains(&group.category) {
                    assessment.categories.push(group.category);
                }
            }
        }
    }

    if content.contains("http://") || content.contains("https://") {
        assessment.score += 15;
        assessment.matches.push("spam:url".to_string());
        if !assessment.categories.contains(&"spam") {
            assessment.categories.push("spam");
        }
    }

    let uppercase = content
        .chars()
        .filter(|c| c.is_ascii_alphabetic() && c.is_ascii_uppercase())
        .count();
    let alpha = content.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if alpha >= 10 && (uppercase as f32 / alpha as f32) > 0.8 {
        assessment.score += 10;
        assessment.matches.push("tone:all_caps".to_string());
    }

    assessment.score = assessment.score.clamp(0, 100);
    assessment
}

fn verdict(content: &str) -> Value {
    let assessment = assess(content);
    let (allowed, action, severity) = match assessment.score {
        90..=100 => (false, "block", "CRITICAL"),
        70..=89 => (false, "block", "HIGH"),
        40..=69 => (true, "warn", "MEDIUM"),
        _ => (true, "allow", "LOW"),
    };
    let reason = if assessment.matches.is_empty() {
        "No policy violations detected".to_string()
    } else {
        format!("Matched {}", assessment.matches.join(", "))
    };
    let confidence = (0.6 + f64::from(assessment.score) / 250.0).min(0.95);

    json!({
        "allowed": allowed,
        "severity": severity,
        "categories": assessment.categories,
        "action": action,
        "reason": reason,
        "confidence": confidence,
    })
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentAnalyzer for HeuristicAnalyzer {
    async fn analyze_raw(&self, contents: &[String]) -> Result<Value, AnalyzerError> {
        Ok(Value::Array(contents.iter().map(|c| verdict(c)).collect()))
    }
}
