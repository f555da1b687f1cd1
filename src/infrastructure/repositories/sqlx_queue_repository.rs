use crate::domain::{
    moderation::{
        entity::{ModerationQueueItem, ModerationResult, QueueStatus},
        repository::QueueStore,
    },
    shared::{errors::DomainError, pagination::PaginationRequest},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use std::collections::HashSet;
use uuid::Uuid;

const QUEUE_COLUMNS: &str = "id, user_id, user_name, content_type, content_id, content, \
     enqueued_at, status, priority, result, processed_at, claimed_at, claim_token, \
     retry_count";

#[derive(Debug, FromRow)]
struct QueueRow {
    id: Uuid,
    user_id: String,
    user_name: String,
    content_type: String,
    content_id: String,
    content: String,
    enqueued_at: DateTime<Utc>,
    status: String,
    priority: String,
    result: Option<Json<ModerationResult>>,
    processed_at: Option<DateTime<Utc>>,
    claimed_at: Option<DateTime<Utc>>,
    claim_token: Option<Uuid>,
    retry_count: i32,
}

impl TryFrom<QueueRow> for ModerationQueueItem {
    type Error = DomainError;

    fn try_from(row: QueueRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            content_type: row.content_type.parse()?,
            content_id: row.content_id,
            content: row.content,
            timestamp: row.enqueued_at,
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            result: row.result.map(|Json(result)| result),
            processed_at: row.processed_at,
            claimed_at: row.claimed_at,
            claim_token: row.claim_token,
            retry_count: row.retry_count,
        })
    }
}

fn into_items(rows: Vec<QueueRow>) -> Result<Vec<ModerationQueueItem>, DomainError> {
    rows.into_iter().map(ModerationQueueItem::try_from).collect()
}

pub struct SqlxQueueStore {
    pub pool: PgPool,
}

impl SqlxQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for SqlxQueueStore {
    async fn enqueue(&self, item: &ModerationQueueItem) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO moderation_queue (
                id, user_id, user_name, content_type, content_id, content,
                enqueued_at, status, priority, retry_count
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(item.id)
        .bind(&item.user_id)
        .bind(&item.user_name)
        .bind(item.content_type.as_str())
        .bind(&item.content_id)
        .bind(&item.content)
        .bind(item.timestamp)
        .bind(item.status.as_str())
        .bind(item.priority.as_str())
        .bind(item.retry_count)
        .execute(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ModerationQueueItem>, DomainError> {
        let row = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {} FROM moderation_queue WHERE id = $1",
            QUEUE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        row.map(ModerationQueueItem::try_from).transpose()
    }

    async fn list(
        &self,
        status: Option<QueueStatus>,
        page: &PaginationRequest,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {} FROM moderation_queue
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY enqueued_at DESC
             LIMIT $2 OFFSET $3",
            QUEUE_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        into_items(rows)
    }

    async fn count(&self, status: Option<QueueStatus>) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM moderation_queue WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::infrastructure)
    }

    async fn fetch_pending(&self, limit: usize) -> Result<Vec<ModerationQueueItem>, DomainError> {
        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            "SELECT {} FROM moderation_queue
             WHERE status = 'pending'
             ORDER BY CASE priority WHEN 'high' THEN 3 WHEN 'medium' THEN 2 ELSE 1 END DESC,
                      enqueued_at ASC,
                      id ASC
             LIMIT $1",
            QUEUE_COLUMNS
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        into_items(rows)
    }

    async fn claim(
        &self,
        ids: &[Uuid],
        claimed_at: DateTime<Utc>,
        token: Uuid,
    ) -> Result<HashSet<Uuid>, DomainError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }
        // The status predicate is the compare half of the swap: rows another
        // cycle already moved to 'processing' simply do not match.
        let claimed = sqlx::query_scalar::<_, Uuid>(
            "UPDATE moderation_queue
             SET status = 'processing', claimed_at = $2, claim_token = $3
             WHERE id = ANY($1) AND status = 'pending'
             RETURNING id",
        )
        .bind(ids)
        .bind(claimed_at)
        .bind(token)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        Ok(claimed.into_iter().collect())
    }

    async fn complete(
        &self,
        id: Uuid,
        token: Uuid,
        status: QueueStatus,
        result: &ModerationResult,
        processed_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let done = sqlx::query(
            "UPDATE moderation_queue
             SET status = $3, result = $4, processed_at = $5
             WHERE id = $1 AND status = 'processing' AND claim_token = $2",
        )
        .bind(id)
        .bind(token)
        .bind(status.as_str())
        .bind(Json(result))
        .bind(processed_at)
        .execute(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;

        if done.rows_affected() > 0 {
            return Ok(());
        }
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM moderation_queue WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        if exists {
            Err(DomainError::Conflict(format!(
                "queue item {} is no longer held by this claim",
                id
            )))
        } else {
            Err(DomainError::NotFound(format!("queue item {}", id)))
        }
    }

    async fn release(
        &self,
        ids: &[Uuid],
        token: Uuid,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, QueueRow>(&format!(
            "UPDATE moderation_queue
             SET status = 'pending', claimed_at = NULL, claim_token = NULL,
                 retry_count = retry_count + 1
             WHERE id = ANY($1) AND status = 'processing' AND claim_token = $2
             RETURNING {}",
            QUEUE_COLUMNS
        ))
        .bind(ids)
        .bind(token)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        into_items(rows)
    }

    async fn reclaim_stale(
        &self,
        claimed_before: DateTime<Utc>,
        claimed_at: DateTime<Utc>,
        token: Uuid,
    ) -> Result<Vec<ModerationQueueItem>, DomainError> {
        let mut items = into_items(
            sqlx::query_as::<_, QueueRow>(&format!(
                "UPDATE moderation_queue
                 SET claimed_at = $2, claim_token = $3
                 WHERE status = 'processing' AND claimed_at < $1
                 RETURNING {}",
                QUEUE_COLUMNS
            ))
            .bind(claimed_before)
            .bind(claimed_at)
            .bind(token)
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::infrastructure)?,
        )?;
        items.sort_by(|a, b| a.queue_order(b));
        Ok(items)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DomainError::infrastructure)?;
        Ok(())
    }
}
