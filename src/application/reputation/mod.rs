pub mod dto;
pub mod scorer;
