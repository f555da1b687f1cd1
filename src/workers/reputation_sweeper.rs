use crate::application::reputation::scorer::ReputationScorer;
use std::{sync::Arc, time::Duration};

/// Periodic full recompute of every user's reputation.
pub struct ReputationSweeper {
    scorer: Arc<ReputationScorer>,
    interval_seconds: u64,
}

impl ReputationSweeper {
    pub fn new(scorer: Arc<ReputationScorer>, interval_seconds: u64) -> Self {
        Self {
            scorer,
            interval_seconds: interval_seconds.max(60),
        }
    }

    pub async fn start(&self) {
        loop {
            tokio::time::sleep(Duration::from_secs(self.interval_seconds)).await;
            if let Err(e) = self.scorer.recompute_all().await {
                tracing::error!(error = %e, "reputation sweep could not list users");
            }
        }
    }
}
