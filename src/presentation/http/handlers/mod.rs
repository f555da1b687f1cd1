pub mod health;
pub mod moderation;
pub mod reputation;
pub mod ws;
