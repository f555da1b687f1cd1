pub mod analysis;
pub mod dto;
pub mod processor;
pub mod propagator;
pub mod use_case;
