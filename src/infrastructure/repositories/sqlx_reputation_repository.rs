use crate::domain::{
    moderation::entity::ModerationAction,
    reputation::{
        entity::{
            HistoryEntry, ManualOverride, Perks, ReputationMetrics, Restrictions, Tier,
            UserReputation,
        },
        repository::{ActivitySource, ActivityWindow, PostActivity, ReputationRepository},
    },
    shared::errors::DomainError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};

#[derive(Debug, FromRow)]
struct ReputationRow {
    user_id: String,
    score: f64,
    tier: String,
    metrics: Json<ReputationMetrics>,
    perks: Json<Perks>,
    restrictions: Json<Restrictions>,
    history: Json<Vec<HistoryEntry>>,
    manual_override: Option<Json<ManualOverride>>,
    visibility_public: bool,
    last_calculated: DateTime<Utc>,
}

impl TryFrom<ReputationRow> for UserReputation {
    type Error = DomainError;

    fn try_from(row: ReputationRow) -> Result<Self, Self::Error> {
        let tier = Tier::parse(&row.tier)
            .ok_or_else(|| DomainError::ValidationError(format!("unknown tier '{}'", row.tier)))?;
        Ok(Self {
            user_id: row.user_id,
            score: row.score,
            tier,
            metrics: row.metrics.0,
            perks: row.perks.0,
            restrictions: row.restrictions.0,
            history: row.history.0,
            manual_override: row.manual_override.map(|Json(o)| o),
            visibility_public: row.visibility_public,
            last_calculated: row.last_calculated,
        })
    }
}

pub struct SqlxReputationRepository {
    pub pool: PgPool,
}

impl SqlxReputationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReputationRepository for SqlxReputationRepository {
    async fn get(&self, user_id: &str) -> Result<Option<UserReputation>, DomainError> {
        let row = sqlx::query_as::<_, ReputationRow>(
            "SELECT user_id, score, tier, metrics, perks, restrictions, history,
                    manual_override, visibility_public, last_calculated
             FROM user_reputation WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        row.map(UserReputation::try_from).transpose()
    }

    async fn save(&self, reputation: &UserReputation) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO user_reputation (
                user_id, score, tier, metrics, perks, restrictions, history,
                manual_override, visibility_public, last_calculated
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE
            SET score = EXCLUDED.score,
                tier = EXCLUDED.tier,
                metrics = EXCLUDED.metrics,
                perks = EXCLUDED.perks,
                restrictions = EXCLUDED.restrictions,
                history = EXCLUDED.history,
                manual_override = EXCLUDED.manual_override,
                visibility_public = EXCLUDED.visibility_public,
                last_calculated = EXCLUDED.last_calculated",
        )
        .bind(&reputation.user_id)
        .bind(reputation.score)
        .bind(reputation.tier.as_str())
        .bind(Json(&reputation.metrics))
        .bind(Json(&reputation.perks))
        .bind(Json(&reputation.restrictions))
        .bind(Json(&reputation.history))
        .bind(reputation.manual_override.as_ref().map(Json))
        .bind(reputation.visibility_public)
        .bind(reputation.last_calculated)
        .execute(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;
        Ok(())
    }
}

/// Reads the trailing-window signals from the content services' tables.
pub struct SqlxActivitySource {
    pub pool: PgPool,
}

impl SqlxActivitySource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActivitySource for SqlxActivitySource {
    async fn window(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<ActivityWindow, DomainError> {
        let posts = sqlx::query_as::<_, (i32, i32)>(
            "SELECT likes_count, comments_count FROM community_posts
             WHERE author_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?
        .into_iter()
        .map(|(likes, comments)| PostActivity { likes, comments })
        .collect();

        let moderation_actions = sqlx::query_scalar::<_, String>(
            "SELECT action FROM moderation_logs WHERE user_id = $1 AND logged_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?
        .iter()
        .filter_map(|action| ModerationAction::parse(action))
        .collect();

        let message_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM chat_messages WHERE sender_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;

        let marketplace_rating = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(AVG(rating), 0)::float8 FROM marketplace_reviews
             WHERE seller_id = $1 AND created_at >= $2",
        )
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(DomainError::infrastructure)?;

        Ok(ActivityWindow {
            posts,
            moderation_actions,
            message_count: u32::try_from(message_count).unwrap_or(u32::MAX),
            marketplace_rating,
        })
    }

    async fn user_ids(&self) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar::<_, String>("SELECT id::text FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(DomainError::infrastructure)
    }
}
