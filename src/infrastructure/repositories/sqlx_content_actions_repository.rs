use crate::domain::{
    moderation::{
        entity::ContentType,
        repository::{AccountActions, ContentModerationStatus, ContentStatusWriter},
    },
    shared::errors::DomainError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Writes moderation outcomes onto records owned by the content and account
/// services. Every write is a full upsert, so replays are harmless.
pub struct SqlxContentActionsRepository {
    pub pool: PgPool,
}

impl SqlxContentActionsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentStatusWriter for SqlxContentActionsRepository {
    async fn set_moderation_status(
        &self,
        content_type: ContentType,
        content_id: &str,
        status: ContentModerationStatus,
        reason: &str,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO content_moderation_status (
                content_type, content_id, moderation_status, moderation_reason, updated_at
            ) VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (content_type, content_id) DO UPDATE
            SET moderation_status = EXCLUDED.moderation_status,
                moderation_reason = EXCLUDED.moderation_reason,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(content_type.as_str())
        .bind(content_id)
        .bind(status.as_str())
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        Ok(())
    }
}

#[async_trait]
impl AccountActions for SqlxContentActionsRepository {
    async fn suspend_user(
        &self,
        user_id: &str,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO user_suspensions (user_id, suspended, reason, suspended_at)
             VALUES ($1, TRUE, $2, $3)
             ON CONFLICT (user_id) DO UPDATE
             SET suspended = TRUE,
                 reason = EXCLUDED.reason,
                 suspended_at = EXCLUDED.suspended_at",
        )
        .bind(user_id)
        .bind(reason)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        Ok(())
    }
}
