use super::analysis::AnalysisEngine;
use super::propagator::ConsequencePropagator;
use crate::domain::moderation::{
    entity::{ModerationQueueItem, ModerationResult, QueueStatus},
    events::ModerationEvent,
    repository::QueueStore,
};
use crate::domain::shared::{clock::Clock, errors::DomainError};
use crate::infrastructure::ml::traits::AnalyzerError;
use crate::infrastructure::security::content_precheck::{PrecheckCategories, precheck};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("queue store failure: {0}")]
    Store(#[from] DomainError),
    #[error("analyzer rejected credentials: {0}")]
    AnalyzerUnauthorized(String),
}

#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub batch_size: usize,
    /// Failed analyses an item may accumulate before it is dead-lettered
    pub max_retries: i32,
    pub precheck_categories: PrecheckCategories,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            precheck_categories: PrecheckCategories::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct BatchReport {
    /// Items this cycle won in the claim step
    pub claimed: usize,
    pub approved: usize,
    pub rejected: usize,
    pub requeued: usize,
    pub dead_lettered: usize,
    /// Best-effort writes (log, content status, suspension) that failed
    pub propagation_failures: usize,
    /// Items whose queue write failed; they stay claimed until stale recovery
    pub failed: usize,
    /// Items whose claim passed to another cycle before the verdict landed;
    /// the verdict was discarded
    pub superseded: usize,
}

/// One moderation cycle: select, claim, analyze, apply.
///
/// Holds no state between cycles. Overlapping cycles are safe because the
/// claim is a compare-and-swap on the store, and every later write for an
/// item is fenced by the token of the claim that won it.
pub struct BatchProcessor {
    queue: Arc<dyn QueueStore>,
    engine: Arc<AnalysisEngine>,
    propagator: Arc<ConsequencePropagator>,
    clock: Arc<dyn Clock>,
    settings: ProcessorSettings,
    events: Option<Arc<broadcast::Sender<String>>>,
}

impl BatchProcessor {
    pub fn new(
        queue: Arc<dyn QueueStore>,
        engine: Arc<AnalysisEngine>,
        propagator: Arc<ConsequencePropagator>,
        clock: Arc<dyn Clock>,
        settings: ProcessorSettings,
    ) -> Self {
        Self {
            queue,
            engine,
            propagator,
            clock,
            settings,
            events: None,
        }
    }

    pub fn with_events(mut self, events: Arc<broadcast::Sender<String>>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Runs one cycle. `budget` bounds the analyzer call; running out of it
    /// counts as a transient analysis failure.
    #[instrument(skip(self), fields(batch_size = self.settings.batch_size))]
    pub async fn process_batch(&self, budget: Duration) -> Result<BatchReport, ProcessError> {
        let mut report = BatchReport::default();

        let selected = self.queue.fetch_pending(self.settings.batch_size).await?;
        if selected.is_empty() {
            debug!("no pending items");
            return Ok(report);
        }

        let ids: Vec<Uuid> = selected.iter().map(|item| item.id).collect();
        let token = Uuid::now_v7();
        let claimed_at = self.clock.now();
        let won = self.queue.claim(&ids, claimed_at, token).await?;
        let claimed: Vec<ModerationQueueItem> = selected
            .into_iter()
            .filter(|item| won.contains(&item.id))
            .map(|mut item| {
                item.status = QueueStatus::Processing;
                item.claimed_at = Some(claimed_at);
                item.claim_token = Some(token);
                item
            })
            .collect();
        report.claimed = claimed.len();
        if claimed.is_empty() {
            debug!("every selected item was claimed by another cycle");
            return Ok(report);
        }

        let mut to_analyze = Vec::with_capacity(claimed.len());
        for item in claimed {
            match precheck(&item.content).blocking_result(&self.settings.precheck_categories) {
                Some(verdict) => self.apply(&item, &verdict, &mut report).await,
                None => to_analyze.push(item),
            }
        }

        if !to_analyze.is_empty() {
            let contents: Vec<String> = to_analyze.iter().map(|i| i.content.clone()).collect();
            let analysis = tokio::time::timeout(budget, self.engine.analyze(&contents))
                .await
                .unwrap_or(Err(AnalyzerError::Timeout(budget)));

            match analysis {
                Ok(verdicts) => {
                    for (item, verdict) in to_analyze.iter().zip(verdicts.iter()) {
                        self.apply(item, verdict, &mut report).await;
                    }
                }
                Err(AnalyzerError::Unauthorized(message)) => {
                    error!(error = %message, "analyzer rejected credentials, releasing batch");
                    let ids: Vec<Uuid> = to_analyze.iter().map(|i| i.id).collect();
                    let released = self.queue.release(&ids, token).await?;
                    self.announce_requeued(&released);
                    return Err(ProcessError::AnalyzerUnauthorized(message));
                }
                Err(e) => {
                    warn!(error = %e, items = to_analyze.len(), "analysis failed, returning batch to queue");
                    self.handle_failed_analysis(&to_analyze, token, &mut report)
                        .await?;
                }
            }
        }

        info!(
            claimed = report.claimed,
            approved = report.approved,
            rejected = report.rejected,
            requeued = report.requeued,
            dead_lettered = report.dead_lettered,
            propagation_failures = report.propagation_failures,
            superseded = report.superseded,
            "moderation batch finished"
        );
        Ok(report)
    }

    /// Takes over claims older than `claimed_before`, then treats each like
    /// a failed analysis: back to pending, or dead-lettered once the item
    /// has used up its retries.
    pub async fn recover_stale(
        &self,
        claimed_before: DateTime<Utc>,
    ) -> Result<BatchReport, DomainError> {
        let token = Uuid::now_v7();
        let stale = self
            .queue
            .reclaim_stale(claimed_before, self.clock.now(), token)
            .await?;
        let mut report = BatchReport::default();
        if stale.is_empty() {
            return Ok(report);
        }

        warn!(items = stale.len(), "recovering stale moderation claims");
        self.handle_failed_analysis(&stale, token, &mut report).await?;
        Ok(report)
    }

    async fn handle_failed_analysis(
        &self,
        items: &[ModerationQueueItem],
        token: Uuid,
        report: &mut BatchReport,
    ) -> Result<(), DomainError> {
        let (exhausted, retryable): (Vec<&ModerationQueueItem>, Vec<&ModerationQueueItem>) = items
            .iter()
            .partition(|item| item.retry_count + 1 >= self.settings.max_retries);

        for item in exhausted {
            let verdict = ModerationResult::manual_review(item.retry_count + 1);
            warn!(queue_item_id = %item.id, attempts = item.retry_count + 1, "dead-lettering queue item");
            if self.apply_quietly(item, &verdict, report).await {
                report.dead_lettered += 1;
                self.publish(ModerationEvent::DeadLettered {
                    queue_item_id: item.id,
                    content_id: item.content_id.clone(),
                });
            }
        }

        let ids: Vec<Uuid> = retryable.iter().map(|item| item.id).collect();
        if !ids.is_empty() {
            let released = self.queue.release(&ids, token).await?;
            report.requeued += released.len();
            self.announce_requeued(&released);
        }
        Ok(())
    }

    async fn apply(
        &self,
        item: &ModerationQueueItem,
        verdict: &ModerationResult,
        report: &mut BatchReport,
    ) {
        if !self.apply_quietly(item, verdict, report).await {
            return;
        }
        if verdict.allowed {
            report.approved += 1;
            self.publish(ModerationEvent::Approved {
                queue_item_id: item.id,
                content_id: item.content_id.clone(),
            });
        } else {
            report.rejected += 1;
            self.publish(ModerationEvent::Rejected {
                queue_item_id: item.id,
                content_id: item.content_id.clone(),
                action: verdict.action,
                severity: verdict.severity,
            });
        }
    }

    /// Applies without counting the verdict. Returns whether the queue write landed.
    async fn apply_quietly(
        &self,
        item: &ModerationQueueItem,
        verdict: &ModerationResult,
        report: &mut BatchReport,
    ) -> bool {
        match self
            .propagator
            .apply_verdict(item, verdict, self.clock.now())
            .await
        {
            Ok(propagation) => {
                report.propagation_failures += propagation.failures.len();
                true
            }
            Err(DomainError::Conflict(reason)) => {
                warn!(queue_item_id = %item.id, reason = %reason, "claim lost, verdict discarded");
                report.superseded += 1;
                false
            }
            Err(e) => {
                error!(queue_item_id = %item.id, error = %e, "failed to record verdict");
                report.failed += 1;
                false
            }
        }
    }

    fn announce_requeued(&self, released: &[ModerationQueueItem]) {
        for item in released {
            self.publish(ModerationEvent::Requeued {
                queue_item_id: item.id,
                retry_count: item.retry_count,
            });
        }
    }

    fn publish(&self, event: ModerationEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event.to_message());
        }
    }
}
