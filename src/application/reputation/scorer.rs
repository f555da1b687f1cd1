//! Trust score over a trailing seven-day window.
//!
//! ```text
//! score = 50 + 3*helpful_posts + consistency + engagement
//!            + 5*marketplace_rating - 15*violations - 5*warnings
//! ```
//!
//! clamped to `[0, 100]` and rounded to two decimals. Reputation only ever
//! unlocks perks; it never restricts posting.

use super::dto::RecomputeSummary;
use crate::domain::moderation::entity::ModerationAction;
use crate::domain::reputation::{
    entity::{
        HistoryEntry, MAX_SCORE, MIN_SCORE, ManualOverride, Perks, ReputationMetrics,
        Restrictions, Tier, UserReputation,
    },
    repository::{ActivitySource, ActivityWindow, ReputationRepository},
};
use crate::domain::shared::{clock::Clock, errors::DomainError};
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const WINDOW_DAYS: i64 = 7;

const HELPFUL_MIN_LIKES: i32 = 5;
const HELPFUL_MIN_COMMENTS: i32 = 3;
const CONSISTENCY_MIN_POSTS: u32 = 3;
const CONSISTENCY_CAP: f64 = 15.0;
const ENGAGEMENT_CAP: f64 = 20.0;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn compute_metrics(window: &ActivityWindow) -> ReputationMetrics {
    let total_posts = u32::try_from(window.posts.len()).unwrap_or(u32::MAX);
    let helpful_posts = window
        .posts
        .iter()
        .filter(|p| p.likes >= HELPFUL_MIN_LIKES || p.comments >= HELPFUL_MIN_COMMENTS)
        .count();
    let violations = window
        .moderation_actions
        .iter()
        .filter(|a| a.is_account_level())
        .count();
    let warnings = window
        .moderation_actions
        .iter()
        .filter(|a| **a == ModerationAction::Warn)
        .count();

    let consistency = if total_posts >= CONSISTENCY_MIN_POSTS {
        (f64::from(total_posts) / WINDOW_DAYS as f64 * 10.0).min(CONSISTENCY_CAP)
    } else {
        0.0
    };
    let engagement =
        ((f64::from(window.message_count) + f64::from(total_posts)) / 20.0 * 15.0).min(ENGAGEMENT_CAP);

    ReputationMetrics {
        helpful_posts: u32::try_from(helpful_posts).unwrap_or(u32::MAX),
        total_posts,
        violations: u32::try_from(violations).unwrap_or(u32::MAX),
        warnings: u32::try_from(warnings).unwrap_or(u32::MAX),
        message_count: window.message_count,
        consistency: round2(consistency),
        engagement: round2(engagement),
        marketplace_rating: round2(window.marketplace_rating),
    }
}

pub fn score_from_metrics(metrics: &ReputationMetrics) -> f64 {
    let raw = 50.0 + 3.0 * f64::from(metrics.helpful_posts)
        + metrics.consistency
        + metrics.engagement
        + 5.0 * metrics.marketplace_rating
        - 15.0 * f64::from(metrics.violations)
        - 5.0 * f64::from(metrics.warnings);
    if !raw.is_finite() {
        return MIN_SCORE;
    }
    round2(raw.clamp(MIN_SCORE, MAX_SCORE))
}

/// Always unrestricted, whatever the score.
pub fn calculate_restrictions(_score: f64) -> Restrictions {
    Restrictions::unrestricted()
}

pub struct ReputationScorer {
    repository: Arc<dyn ReputationRepository>,
    activity: Arc<dyn ActivitySource>,
    clock: Arc<dyn Clock>,
}

impl ReputationScorer {
    pub fn new(
        repository: Arc<dyn ReputationRepository>,
        activity: Arc<dyn ActivitySource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            activity,
            clock,
        }
    }

    /// Existing record, or a fresh score-50 record persisted on first reference.
    pub async fn get_or_init(&self, user_id: &str) -> Result<UserReputation, DomainError> {
        if let Some(existing) = self.repository.get(user_id).await? {
            return Ok(existing);
        }
        let fresh = UserReputation::new(user_id, self.clock.now());
        self.repository.save(&fresh).await?;
        debug!(user_id, "initialized reputation record");
        Ok(fresh)
    }

    #[instrument(skip(self))]
    pub async fn recompute(&self, user_id: &str) -> Result<f64, DomainError> {
        let now = self.clock.now();
        let window = self
            .activity
            .window(user_id, now - Duration::days(WINDOW_DAYS))
            .await?;
        let metrics = compute_metrics(&window);
        let score = score_from_metrics(&metrics);

        let mut reputation = match self.repository.get(user_id).await? {
            Some(existing) => existing,
            None => UserReputation::new(user_id, now),
        };
        reputation.score = score;
        reputation.tier = Tier::for_score(score);
        reputation.perks = Perks::for_score(score);
        reputation.restrictions = calculate_restrictions(score);
        reputation.metrics = metrics;
        reputation.last_calculated = now;
        if let Some(manual) = reputation.manual_override.as_mut() {
            manual.active = false;
        }
        self.repository.save(&reputation).await?;

        debug!(user_id, score, tier = reputation.tier.as_str(), "reputation recomputed");
        Ok(score)
    }

    /// Recomputes every known user in turn. A failing user is logged and
    /// skipped; only failing to list users aborts the sweep.
    pub async fn recompute_all(&self) -> Result<RecomputeSummary, DomainError> {
        let user_ids = self.activity.user_ids().await?;
        let mut summary = RecomputeSummary::default();

        for user_id in user_ids {
            summary.processed += 1;
            match self.recompute(&user_id).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "reputation recompute failed");
                    summary.failed += 1;
                    summary.failed_users.push(user_id);
                }
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            "reputation sweep finished"
        );
        Ok(summary)
    }

    /// Admin escape hatch. Holds until the next recompute.
    pub async fn manual_override(
        &self,
        user_id: &str,
        score: f64,
        admin_id: &str,
        reason: &str,
    ) -> Result<UserReputation, DomainError> {
        if !score.is_finite() {
            return Err(DomainError::ValidationError("score must be a number".into()));
        }
        let now = self.clock.now();
        let score = round2(score.clamp(MIN_SCORE, MAX_SCORE));

        let mut reputation = self.get_or_init(user_id).await?;
        reputation.score = score;
        reputation.tier = Tier::for_score(score);
        reputation.perks = Perks::for_score(score);
        reputation.restrictions = calculate_restrictions(score);
        reputation.push_history(HistoryEntry {
            date: now,
            score,
            reason: reason.to_string(),
        });
        reputation.manual_override = Some(ManualOverride {
            active: true,
            admin_id: admin_id.to_string(),
            reason: reason.to_string(),
            date: now,
        });
        self.repository.save(&reputation).await?;

        info!(user_id, admin_id, score, "reputation manually overridden");
        Ok(reputation)
    }

    pub async fn set_visibility(
        &self,
        user_id: &str,
        visibility_public: bool,
    ) -> Result<UserReputation, DomainError> {
        let mut reputation = self.get_or_init(user_id).await?;
        reputation.visibility_public = visibility_public;
        self.repository.save(&reputation).await?;
        Ok(reputation)
    }
}
