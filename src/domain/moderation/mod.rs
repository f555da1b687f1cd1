pub mod entity;
pub mod events;
pub mod log;
pub mod repository;
