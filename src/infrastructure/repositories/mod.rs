pub mod in_memory;
pub mod sqlx_content_actions_repository;
pub mod sqlx_moderation_log_repository;
pub mod sqlx_queue_repository;
pub mod sqlx_reputation_repository;
