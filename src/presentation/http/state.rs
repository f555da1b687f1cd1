use crate::{
    application::{
        moderation::{processor::BatchProcessor, use_case::ModerationUseCase},
        reputation::scorer::ReputationScorer,
    },
    config::Config,
    domain::moderation::repository::QueueStore,
};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub queue: Arc<dyn QueueStore>,
    pub moderation: Arc<ModerationUseCase>,
    pub processor: Arc<BatchProcessor>,
    pub reputation: Arc<ReputationScorer>,
    pub ws_broadcaster: Arc<broadcast::Sender<String>>,
}
