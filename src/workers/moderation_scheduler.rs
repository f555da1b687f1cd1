use crate::application::moderation::processor::{BatchProcessor, BatchReport, ProcessError};
use crate::domain::shared::clock::Clock;
use std::{sync::Arc, time::Duration};
use tokio::time::MissedTickBehavior;

/// Timer-driven moderation cycles.
///
/// Each tick first recovers stale claims, then spawns an independent cycle.
/// A cycle that overruns its interval is left running; the next one only
/// sees items that are still pending.
pub struct ModerationScheduler {
    processor: Arc<BatchProcessor>,
    clock: Arc<dyn Clock>,
    interval_seconds: u64,
    budget: Duration,
    stale_after_minutes: i64,
}

impl ModerationScheduler {
    pub fn new(
        processor: Arc<BatchProcessor>,
        clock: Arc<dyn Clock>,
        interval_seconds: u64,
        budget: Duration,
        stale_after_minutes: i64,
    ) -> Self {
        Self {
            processor,
            clock,
            interval_seconds: interval_seconds.max(1),
            budget,
            stale_after_minutes: stale_after_minutes.max(1),
        }
    }

    pub async fn start(&self) {
        tracing::info!(
            interval_seconds = self.interval_seconds,
            budget_seconds = self.budget.as_secs(),
            "moderation scheduler started"
        );
        let mut ticker = tokio::time::interval(Duration::from_secs(self.interval_seconds));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.recover_stale_claims().await;

            let processor = self.processor.clone();
            let budget = self.budget;
            tokio::spawn(async move {
                if let Err(e) = processor.process_batch(budget).await {
                    report_failure(&e);
                }
            });
        }
    }

    /// One recover-then-process pass, awaited inline.
    pub async fn run_once(&self) -> Result<BatchReport, ProcessError> {
        self.recover_stale_claims().await;
        self.processor.process_batch(self.budget).await
    }

    async fn recover_stale_claims(&self) {
        let cutoff = self.clock.now() - chrono::Duration::minutes(self.stale_after_minutes);
        if let Err(e) = self.processor.recover_stale(cutoff).await {
            tracing::error!(error = %e, "stale claim recovery failed");
        }
    }
}

fn report_failure(err: &ProcessError) {
    match err {
        ProcessError::AnalyzerUnauthorized(msg) => {
            tracing::error!(alert = true, error = %msg, "moderation analyzer credentials rejected");
        }
        ProcessError::Store(e) => {
            tracing::error!(error = %e, "moderation cycle failed");
        }
    }
}
