use crate::domain::{
    moderation::{
        entity::Severity,
        log::{LogStatus, ModerationLogEntry},
        repository::ModerationLogSink,
    },
    shared::errors::DomainError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, FromRow)]
struct LogRow {
    id: Uuid,
    queue_item_id: Uuid,
    user_id: String,
    user_name: String,
    content_type: String,
    content_id: String,
    content: String,
    action: String,
    reason: String,
    severity: String,
    logged_at: DateTime<Utc>,
}

impl TryFrom<LogRow> for ModerationLogEntry {
    type Error = DomainError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            queue_item_id: row.queue_item_id,
            user_id: row.user_id,
            user_name: row.user_name,
            content_type: row.content_type.parse()?,
            content_id: row.content_id,
            content: row.content,
            action: row.action.parse()?,
            reason: row.reason,
            severity: row.severity.parse::<Severity>()?,
            timestamp: row.logged_at,
            status: LogStatus::Flagged,
        })
    }
}

pub struct SqlxModerationLogRepository {
    pub pool: PgPool,
}

impl SqlxModerationLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ModerationLogSink for SqlxModerationLogRepository {
    async fn append(&self, entry: &ModerationLogEntry) -> Result<bool, DomainError> {
        let done = sqlx::query(
            "INSERT INTO moderation_logs (
                id, queue_item_id, user_id, user_name, content_type, content_id,
                content, action, reason, severity, logged_at, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'flagged')
            ON CONFLICT (queue_item_id) DO NOTHING",
        )
        .bind(entry.id)
        .bind(entry.queue_item_id)
        .bind(&entry.user_id)
        .bind(&entry.user_name)
        .bind(entry.content_type.as_str())
        .bind(&entry.content_id)
        .bind(&entry.content)
        .bind(entry.action.as_str())
        .bind(&entry.reason)
        .bind(entry.severity.as_str())
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        Ok(done.rows_affected() == 1)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<ModerationLogEntry>, DomainError> {
        let rows = sqlx::query_as::<_, LogRow>(
            "SELECT id, queue_item_id, user_id, user_name, content_type, content_id,
                    content, action, reason, severity, logged_at
             FROM moderation_logs
             ORDER BY logged_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        rows.into_iter().map(ModerationLogEntry::try_from).collect()
    }
}
