pub mod moderation;
pub mod reputation;
