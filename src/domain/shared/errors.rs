use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Clone, Error, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
    #[error("Unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn infrastructure(err: impl std::fmt::Display) -> Self {
        DomainError::InfrastructureError(err.to_string())
    }
}
