pub mod moderation_scheduler;
pub mod reputation_sweeper;
