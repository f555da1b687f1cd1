//! HTTP error mapping.
//!
//! Handlers return `AppError`; each variant maps to one status code and a
//! `{ "error": ... }` body that never carries store or analyzer internals.

use crate::application::moderation::processor::ProcessError;
use crate::domain::shared::errors::DomainError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Request body or query failed validation (400)
    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// e.g. a duplicate queue id (409)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Analyzer rejected our credentials (503)
    #[error("upstream unavailable: {0}")]
    ExternalService(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ExternalService(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::NotFound(what) => format!("{} not found", what),
            Self::ValidationError(msg) | Self::Conflict(msg) => msg.clone(),
            Self::Forbidden(_) => "Access denied".into(),
            Self::ExternalService(_) => "Moderation analyzer unavailable".into(),
            Self::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(what) => AppError::NotFound(what),
            DomainError::ValidationError(msg) => AppError::ValidationError(msg),
            DomainError::Conflict(msg) => AppError::Conflict(msg),
            DomainError::Unauthorized => AppError::Forbidden("domain rule".into()),
            DomainError::InfrastructureError(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ProcessError> for AppError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Store(domain) => domain.into(),
            ProcessError::AnalyzerUnauthorized(msg) => AppError::ExternalService(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
