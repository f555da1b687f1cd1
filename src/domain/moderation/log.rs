use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::entity::{ContentType, ModerationAction, ModerationQueueItem, ModerationResult, Severity};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LogStatus {
    #[default]
    Flagged,
}

/// Append-only audit record of a non-allow verdict.
///
/// One entry per queue item: `queue_item_id` is the dedup key, so replaying a
/// verdict never produces a second row.
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct ModerationLogEntry {
    pub id: Uuid,
    pub queue_item_id: Uuid,
    pub user_id: String,
    pub user_name: String,
    pub content_type: ContentType,
    pub content_id: String,
    pub content: String,
    pub action: ModerationAction,
    pub reason: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub status: LogStatus,
}

impl ModerationLogEntry {
    pub fn from_verdict(
        item: &ModerationQueueItem,
        result: &ModerationResult,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            queue_item_id: item.id,
            user_id: item.user_id.clone(),
            user_name: item.user_name.clone(),
            content_type: item.content_type,
            content_id: item.content_id.clone(),
            content: item.content.clone(),
            action: result.action,
            reason: result.reason.clone(),
            severity: result.severity,
            timestamp: at,
            status: LogStatus::Flagged,
        }
    }
}
