use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;
use validator::Validate;

use crate::domain::moderation::entity::{ContentType, NewSubmission, Priority, QueueStatus};
use crate::infrastructure::security::content_precheck::PrecheckOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
#[ts(export)]
pub struct SubmitContentRequest {
    #[validate(length(min = 1, max = 128))]
    pub user_id: String,
    #[validate(length(min = 1, max = 128))]
    pub user_name: String,
    #[validate(length(min = 1))]
    pub content: String,
    pub content_type: ContentType,
    #[validate(length(min = 1, max = 256))]
    pub content_id: String,
    pub priority: Option<Priority>,
}

impl SubmitContentRequest {
    pub fn into_submission(self, priority: Priority) -> NewSubmission {
        NewSubmission {
            user_id: self.user_id,
            user_name: self.user_name,
            content: self.content,
            content_type: self.content_type,
            content_id: self.content_id,
            priority,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmissionResponse {
    pub queue_item_id: Uuid,
    pub priority: Priority,
    pub precheck: PrecheckOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PrecheckRequest {
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueListQuery {
    pub status: Option<QueueStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<i64>,
}
