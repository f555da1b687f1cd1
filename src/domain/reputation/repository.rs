use super::entity::UserReputation;
use crate::domain::moderation::entity::ModerationAction;
use crate::domain::shared::errors::DomainError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PostActivity {
    pub likes: i32,
    pub comments: i32,
}

/// Raw signals for one user inside the scoring window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ActivityWindow {
    pub posts: Vec<PostActivity>,
    pub moderation_actions: Vec<ModerationAction>,
    pub message_count: u32,
    /// Average marketplace rating received in the window, 0 when none
    pub marketplace_rating: f64,
}

/// Read side over the collections the scorer aggregates.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn window(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<ActivityWindow, DomainError>;
    async fn user_ids(&self) -> Result<Vec<String>, DomainError>;
}

#[async_trait]
pub trait ReputationRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserReputation>, DomainError>;
    async fn save(&self, reputation: &UserReputation) -> Result<(), DomainError>;
}
