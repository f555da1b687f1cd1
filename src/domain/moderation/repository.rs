use super::entity::{ContentType, ModerationQueueItem, ModerationResult, QueueStatus};
use super::log::ModerationLogEntry;
use crate::domain::shared::{errors::DomainError, pagination::PaginationRequest};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Durable, priority-ordered store of queue items.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn enqueue(&self, item: &ModerationQueueItem) -> Result<(), DomainError>;
    async fn get(&self, id: Uuid) -> Result<Option<ModerationQueueItem>, DomainError>;
    async fn list(
        &self,
        status: Option<QueueStatus>,
        page: &PaginationRequest,
    ) -> Result<Vec<ModerationQueueItem>, DomainError>;
    async fn count(&self, status: Option<QueueStatus>) -> Result<i64, DomainError>;

    /// Pending items, highest priority first, oldest first within a priority.
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<ModerationQueueItem>, DomainError>;

    /// Compare-and-swap `pending -> processing` under `token`. Returns only
    /// the ids this caller moved; ids already claimed elsewhere are silently skipped.
    async fn claim(
        &self,
        ids: &[Uuid],
        claimed_at: DateTime<Utc>,
        token: Uuid,
    ) -> Result<HashSet<Uuid>, DomainError>;

    /// Records the outcome of an item still held under `token`.
    ///
    /// Fails with `Conflict` once the claim was released or taken over by
    /// another cycle, and with `NotFound` for an unknown id.
    async fn complete(
        &self,
        id: Uuid,
        token: Uuid,
        status: QueueStatus,
        result: &ModerationResult,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// `processing -> pending` with `retry_count + 1` for the ids still held
    /// under `token`. Returns the released items.
    async fn release(
        &self,
        ids: &[Uuid],
        token: Uuid,
    ) -> Result<Vec<ModerationQueueItem>, DomainError>;

    /// Moves every claim taken before `claimed_before` under `token` and
    /// returns the moved items. Retry counts are left alone; the caller
    /// either releases or dead-letters them.
    async fn reclaim_stale(
        &self,
        claimed_before: DateTime<Utc>,
        claimed_at: DateTime<Utc>,
        token: Uuid,
    ) -> Result<Vec<ModerationQueueItem>, DomainError>;

    async fn ping(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
pub trait ModerationLogSink: Send + Sync {
    /// Returns false when an entry for the same queue item already exists.
    async fn append(&self, entry: &ModerationLogEntry) -> Result<bool, DomainError>;
    async fn recent(&self, limit: i64) -> Result<Vec<ModerationLogEntry>, DomainError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentModerationStatus {
    Visible,
    Hidden,
}

impl ContentModerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentModerationStatus::Visible => "visible",
            ContentModerationStatus::Hidden => "hidden",
        }
    }
}

/// Write side of the content stores, addressed by `(content_type, content_id)`.
#[async_trait]
pub trait ContentStatusWriter: Send + Sync {
    async fn set_moderation_status(
        &self,
        content_type: ContentType,
        content_id: &str,
        status: ContentModerationStatus,
        reason: &str,
    ) -> Result<(), DomainError>;
}

#[async_trait]
pub trait AccountActions: Send + Sync {
    async fn suspend_user(
        &self,
        user_id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError>;
}
