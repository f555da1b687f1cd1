use super::dto::{SubmissionResponse, SubmitContentRequest};
use crate::domain::moderation::{
    entity::{ModerationQueueItem, NewSubmission, Priority, QueueStatus},
    log::ModerationLogEntry,
    repository::{ModerationLogSink, QueueStore},
};
use crate::domain::shared::{
    clock::Clock,
    errors::DomainError,
    pagination::{MAX_PAGE_SIZE, PaginatedResponse, PaginationRequest},
};
use crate::infrastructure::security::content_precheck::precheck;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Submission and status-read side of the moderation queue.
pub struct ModerationUseCase {
    queue: Arc<dyn QueueStore>,
    log: Arc<dyn ModerationLogSink>,
    clock: Arc<dyn Clock>,
}

impl ModerationUseCase {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        log: Arc<dyn ModerationLogSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { queue, log, clock }
    }

    /// Queues content that its owning service has already persisted.
    #[instrument(skip(self, submission), fields(
        user_id = %submission.user_id,
        content_type = %submission.content_type,
        content_id = %submission.content_id,
    ))]
    pub async fn enqueue(&self, submission: NewSubmission) -> Result<Uuid, DomainError> {
        if submission.content_id.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "content_id must not be empty".into(),
            ));
        }
        let item = ModerationQueueItem::new(submission, self.clock.now());
        self.queue.enqueue(&item).await?;
        info!(queue_item_id = %item.id, priority = item.priority.as_str(), "content queued for moderation");
        Ok(item.id)
    }

    /// Pre-checks, then enqueues. A failed pre-check raises the priority to high.
    pub async fn submit(
        &self,
        request: SubmitContentRequest,
    ) -> Result<SubmissionResponse, DomainError> {
        let outcome = precheck(&request.content);
        let priority = if outcome.safe {
            request.priority.unwrap_or_default()
        } else {
            Priority::High
        };
        let queue_item_id = self.enqueue(request.into_submission(priority)).await?;
        Ok(SubmissionResponse {
            queue_item_id,
            priority,
            precheck: outcome,
        })
    }

    pub async fn get_item(&self, id: Uuid) -> Result<ModerationQueueItem, DomainError> {
        self.queue
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("queue item {}", id)))
    }

    pub async fn list_queue(
        &self,
        status: Option<QueueStatus>,
        page: PaginationRequest,
    ) -> Result<PaginatedResponse<ModerationQueueItem>, DomainError> {
        let items = self.queue.list(status, &page).await?;
        let total = self.queue.count(status).await?;
        Ok(PaginatedResponse {
            items,
            total,
            limit: page.limit,
            offset: page.offset,
        })
    }

    pub async fn recent_logs(&self, limit: Option<i64>) -> Result<Vec<ModerationLogEntry>, DomainError> {
        self.log
            .recent(limit.unwrap_or(50).clamp(1, MAX_PAGE_SIZE))
            .await
    }
}
