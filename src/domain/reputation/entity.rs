use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub const DEFAULT_SCORE: f64 = 50.0;
pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 100.0;
pub const HISTORY_LIMIT: usize = 10;

/// Display bucket for a reputation score.
///
/// | tier      | score      |
/// |-----------|------------|
/// | novice    | < 40       |
/// | trusted   | [40, 60)   |
/// | veteran   | [60, 75)   |
/// | elite     | [75, 90)   |
/// | legendary | >= 90      |
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Tier {
    #[default]
    Novice,
    Trusted,
    Veteran,
    Elite,
    Legendary,
}

impl Tier {
    pub fn for_score(score: f64) -> Self {
        if score >= 90.0 {
            Tier::Legendary
        } else if score >= 75.0 {
            Tier::Elite
        } else if score >= 60.0 {
            Tier::Veteran
        } else if score >= 40.0 {
            Tier::Trusted
        } else {
            Tier::Novice
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "novice" => Some(Tier::Novice),
            "trusted" => Some(Tier::Trusted),
            "veteran" => Some(Tier::Veteran),
            "elite" => Some(Tier::Elite),
            "legendary" => Some(Tier::Legendary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Novice => "novice",
            Tier::Trusted => "trusted",
            Tier::Veteran => "veteran",
            Tier::Elite => "elite",
            Tier::Legendary => "legendary",
        }
    }
}

/// Cosmetic rewards unlocked by score. Never used to gate anything.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq)]
#[ts(export)]
pub struct Perks {
    pub fast_posting: bool,
    pub highlight_badge: bool,
    pub visibility_boost: bool,
    pub priority_support: bool,
}

impl Perks {
    pub fn for_score(score: f64) -> Self {
        Self {
            fast_posting: score >= 60.0,
            highlight_badge: score >= 75.0,
            visibility_boost: score >= 75.0,
            priority_support: score >= 90.0,
        }
    }
}

/// Posting restrictions. Reputation is a loyalty system, not a punitive one:
/// this is always the unrestricted value and nothing enforces it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
pub struct Restrictions {
    pub posting_limited: bool,
    pub max_posts_per_hour: u32,
}

impl Restrictions {
    pub fn unrestricted() -> Self {
        Self {
            posting_limited: false,
            max_posts_per_hour: u32::MAX,
        }
    }
}

impl Default for Restrictions {
    fn default() -> Self {
        Self::unrestricted()
    }
}

/// Signals aggregated over the trailing window.
#[derive(Debug, Clone, Serialize, Deserialize, TS, Default, PartialEq)]
#[ts(export)]
pub struct ReputationMetrics {
    pub helpful_posts: u32,
    pub total_posts: u32,
    pub violations: u32,
    pub warnings: u32,
    pub message_count: u32,
    pub consistency: f64,
    pub engagement: f64,
    pub marketplace_rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub score: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct ManualOverride {
    pub active: bool,
    pub admin_id: String,
    pub reason: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct UserReputation {
    pub user_id: String,
    pub score: f64,
    pub tier: Tier,
    pub metrics: ReputationMetrics,
    pub perks: Perks,
    pub restrictions: Restrictions,
    /// Most recent last, at most `HISTORY_LIMIT` entries
    pub history: Vec<HistoryEntry>,
    pub manual_override: Option<ManualOverride>,
    pub visibility_public: bool,
    pub last_calculated: DateTime<Utc>,
}

impl UserReputation {
    /// First-reference record: score 50, tier novice until the first recompute.
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            score: DEFAULT_SCORE,
            tier: Tier::Novice,
            metrics: ReputationMetrics::default(),
            perks: Perks::default(),
            restrictions: Restrictions::unrestricted(),
            history: Vec::new(),
            manual_override: None,
            visibility_public: true,
            last_calculated: now,
        }
    }

    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        if self.history.len() > HISTORY_LIMIT {
            let overflow = self.history.len() - HISTORY_LIMIT;
            self.history.drain(..overflow);
        }
    }

    pub fn override_active(&self) -> bool {
        self.manual_override.as_ref().is_some_and(|o| o.active)
    }
}
