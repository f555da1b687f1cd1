pub mod moderation;
pub mod reputation;
pub mod shared;
