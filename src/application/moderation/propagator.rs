use crate::domain::moderation::{
    entity::{ModerationAction, ModerationQueueItem, ModerationResult, Severity},
    log::ModerationLogEntry,
    repository::{
        AccountActions, ContentModerationStatus, ContentStatusWriter, ModerationLogSink,
        QueueStore,
    },
};
use crate::domain::shared::errors::DomainError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationTarget {
    AuditLog,
    ContentStatus,
    Account,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropagationFailure {
    pub target: PropagationTarget,
    pub error: String,
}

/// What a single `apply_verdict` call wrote beyond the queue item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PropagationReport {
    /// False when the action was allow or an entry for the item already existed
    pub logged: bool,
    pub content_hidden: bool,
    pub user_suspended: bool,
    pub failures: Vec<PropagationFailure>,
}

/// Fans a verdict out to the queue item, the audit log, the source content
/// and the author's account.
///
/// The queue write is authoritative and its failure is returned. It only
/// lands while the item is still held under the claim token it carries, so a
/// cycle whose claim was recovered or already finished fans nothing out.
/// Every other write is best effort: failures are logged and reported, never
/// rolled back.
pub struct ConsequencePropagator {
    queue: Arc<dyn QueueStore>,
    log: Arc<dyn ModerationLogSink>,
    content: Arc<dyn ContentStatusWriter>,
    accounts: Arc<dyn AccountActions>,
    suspension_threshold: Severity,
}

impl ConsequencePropagator {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        log: Arc<dyn ModerationLogSink>,
        content: Arc<dyn ContentStatusWriter>,
        accounts: Arc<dyn AccountActions>,
        suspension_threshold: Severity,
    ) -> Self {
        Self {
            queue,
            log,
            content,
            accounts,
            suspension_threshold,
        }
    }

    pub fn requires_suspension(&self, result: &ModerationResult) -> bool {
        !result.allowed
            && result.action.is_account_level()
            && result.severity >= self.suspension_threshold
    }

    pub async fn apply_verdict(
        &self,
        item: &ModerationQueueItem,
        result: &ModerationResult,
        decided_at: DateTime<Utc>,
    ) -> Result<PropagationReport, DomainError> {
        let token = item.claim_token.ok_or_else(|| {
            DomainError::Conflict(format!("queue item {} is not claimed", item.id))
        })?;
        self.queue
            .complete(item.id, token, result.queue_status(), result, decided_at)
            .await?;

        let mut report = PropagationReport::default();

        if result.action != ModerationAction::Allow {
            let entry = ModerationLogEntry::from_verdict(item, result, decided_at);
            match self.log.append(&entry).await {
                Ok(inserted) => {
                    if !inserted {
                        debug!(queue_item_id = %item.id, "audit entry already present");
                    }
                    report.logged = inserted;
                }
                Err(e) => report.fail(item, PropagationTarget::AuditLog, e),
            }
        }

        if !result.allowed {
            match self
                .content
                .set_moderation_status(
                    item.content_type,
                    &item.content_id,
                    ContentModerationStatus::Hidden,
                    &result.reason,
                )
                .await
            {
                Ok(()) => report.content_hidden = true,
                Err(e) => report.fail(item, PropagationTarget::ContentStatus, e),
            }
        }

        if self.requires_suspension(result) {
            match self
                .accounts
                .suspend_user(&item.user_id, &result.reason, decided_at)
                .await
            {
                Ok(()) => report.user_suspended = true,
                Err(e) => report.fail(item, PropagationTarget::Account, e),
            }
        }

        Ok(report)
    }
}

impl PropagationReport {
    fn fail(&mut self, item: &ModerationQueueItem, target: PropagationTarget, error: DomainError) {
        warn!(
            queue_item_id = %item.id,
            content_id = %item.content_id,
            target = ?target,
            error = %error,
            "verdict propagation failed"
        );
        self.failures.push(PropagationFailure {
            target,
            error: error.to_string(),
        });
    }
}
