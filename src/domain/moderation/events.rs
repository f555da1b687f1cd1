use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::{ModerationAction, Severity};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModerationEvent {
    Approved {
        queue_item_id: Uuid,
        content_id: String,
    },
    Rejected {
        queue_item_id: Uuid,
        content_id: String,
        action: ModerationAction,
        severity: Severity,
    },
    Requeued {
        queue_item_id: Uuid,
        retry_count: i32,
    },
    DeadLettered {
        queue_item_id: Uuid,
        content_id: String,
    },
}

impl ModerationEvent {
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
