use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::domain::shared::errors::DomainError;

/// Kind of content a queue item was snapshotted from.
///
/// Determines which content store receives the moderation status when a
/// verdict hides the content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ContentType {
    Post,
    Comment,
    Chat,
    Marketplace,
    Profile,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Post => "post",
            ContentType::Comment => "comment",
            ContentType::Chat => "chat",
            ContentType::Marketplace => "marketplace",
            ContentType::Profile => "profile",
        }
    }
}

impl FromStr for ContentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(ContentType::Post),
            "comment" => Ok(ContentType::Comment),
            "chat" => Ok(ContentType::Chat),
            "marketplace" => Ok(ContentType::Marketplace),
            "profile" => Ok(ContentType::Profile),
            other => Err(DomainError::ValidationError(format!(
                "unknown content type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a queue item.
///
/// # Transitions
/// - `Pending` → `Processing` (claim, at most one cycle wins)
/// - `Processing` → `Approved` | `Rejected` (verdict applied)
/// - `Processing` → `Pending` (analysis failed, `retry_count` incremented)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum QueueStatus {
    #[default]
    Pending,
    Processing,
    Approved,
    Rejected,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Approved => "approved",
            QueueStatus::Rejected => "rejected",
        }
    }

    /// Returns true once a verdict has been recorded.
    pub fn is_final(&self) -> bool {
        matches!(self, QueueStatus::Approved | QueueStatus::Rejected)
    }
}

impl FromStr for QueueStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(QueueStatus::Pending),
            "processing" => Ok(QueueStatus::Processing),
            "approved" => Ok(QueueStatus::Approved),
            "rejected" => Ok(QueueStatus::Rejected),
            other => Err(DomainError::ValidationError(format!(
                "unknown queue status '{}'",
                other
            ))),
        }
    }
}

/// Queue priority. Declaration order is the ordering: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(DomainError::ValidationError(format!(
                "unknown priority '{}'",
                other
            ))),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "UPPERCASE")]
#[ts(export)]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Case-insensitive parse; `None` for anything outside the four levels.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Severity::Low),
            "MEDIUM" => Some(Severity::Medium),
            "HIGH" => Some(Severity::High),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl FromStr for Severity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::parse(s)
            .ok_or_else(|| DomainError::ValidationError(format!("unknown severity '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ModerationAction {
    #[default]
    Allow,
    Warn,
    Block,
    Ban,
    Escalate,
}

impl ModerationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationAction::Allow => "allow",
            ModerationAction::Warn => "warn",
            ModerationAction::Block => "block",
            ModerationAction::Ban => "ban",
            ModerationAction::Escalate => "escalate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "allow" => Some(ModerationAction::Allow),
            "warn" => Some(ModerationAction::Warn),
            "block" => Some(ModerationAction::Block),
            "ban" => Some(ModerationAction::Ban),
            "escalate" => Some(ModerationAction::Escalate),
            _ => None,
        }
    }

    /// Actions that can carry an account-level consequence.
    pub fn is_account_level(&self) -> bool {
        matches!(self, ModerationAction::Block | ModerationAction::Ban)
    }

    /// Actions compatible with `allowed = false`.
    pub fn is_restrictive(&self) -> bool {
        matches!(
            self,
            ModerationAction::Block | ModerationAction::Ban | ModerationAction::Escalate
        )
    }
}

impl FromStr for ModerationAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModerationAction::parse(s)
            .ok_or_else(|| DomainError::ValidationError(format!("unknown action '{}'", s)))
    }
}

pub const AI_UNAVAILABLE_REASON: &str = "Content approved (AI unavailable)";

/// Verdict attached to a queue item once it has been processed.
///
/// # Invariants
/// - `allowed == false` implies `action` is block, ban or escalate
/// - `confidence` lies in `[0.0, 1.0]`
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct ModerationResult {
    pub allowed: bool,
    pub severity: Severity,
    pub categories: Vec<String>,
    pub action: ModerationAction,
    pub reason: String,
    pub confidence: f64,
}

impl ModerationResult {
    /// Fail-open verdict used whenever analyzer output cannot be trusted.
    pub fn ai_unavailable() -> Self {
        Self {
            allowed: true,
            severity: Severity::Low,
            categories: vec![],
            action: ModerationAction::Allow,
            reason: AI_UNAVAILABLE_REASON.to_string(),
            confidence: 0.5,
        }
    }

    /// Dead-letter verdict for items whose analysis kept failing.
    pub fn manual_review(attempts: i32) -> Self {
        Self {
            allowed: false,
            severity: Severity::Medium,
            categories: vec!["manual-review".to_string()],
            action: ModerationAction::Escalate,
            reason: format!(
                "Manual review required (analysis failed {} times)",
                attempts
            ),
            confidence: 0.0,
        }
    }

    /// Queue status this verdict resolves to.
    pub fn queue_status(&self) -> QueueStatus {
        if self.allowed {
            QueueStatus::Approved
        } else {
            QueueStatus::Rejected
        }
    }
}

/// Input of the submission interface.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSubmission {
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub content_type: ContentType,
    pub content_id: String,
    pub priority: Priority,
}

/// Content awaiting, undergoing or having completed moderation.
///
/// The `content` field is a snapshot taken at enqueue time and is never
/// rewritten. Items are never deleted; the queue doubles as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct ModerationQueueItem {
    pub id: Uuid,
    pub user_id: String,
    /// Denormalized display name at submission time
    pub user_name: String,
    pub content_type: ContentType,
    /// Reference to the original content record (owned elsewhere)
    pub content_id: String,
    pub content: String,
    /// Enqueue time; the age tie-breaker within a priority
    pub timestamp: DateTime<Utc>,
    pub status: QueueStatus,
    pub priority: Priority,
    pub result: Option<ModerationResult>,
    pub processed_at: Option<DateTime<Utc>>,
    /// When the current processing claim was taken
    pub claimed_at: Option<DateTime<Utc>>,
    /// Identifies the cycle holding the current claim; only its writes land
    pub claim_token: Option<Uuid>,
    pub retry_count: i32,
}

impl ModerationQueueItem {
    pub fn new(submission: NewSubmission, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id: submission.user_id,
            user_name: submission.user_name,
            content_type: submission.content_type,
            content_id: submission.content_id,
            content: submission.content,
            timestamp: now,
            status: QueueStatus::Pending,
            priority: submission.priority,
            result: None,
            processed_at: None,
            claimed_at: None,
            claim_token: None,
            retry_count: 0,
        }
    }

    /// Selection order: higher priority first, then oldest first.
    pub fn queue_order(&self, other: &Self) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.timestamp.cmp(&other.timestamp))
            .then_with(|| self.id.cmp(&other.id))
    }
}
