use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyzerError {
    #[error("analyzer transport failure: {0}")]
    Transport(String),
    #[error("analyzer did not answer within {0:?}")]
    Timeout(Duration),
    #[error("analyzer rejected credentials: {0}")]
    Unauthorized(String),
}

impl AnalyzerError {
    /// Failures a later cycle may recover from.
    pub fn is_transient(&self) -> bool {
        !matches!(self, AnalyzerError::Unauthorized(_))
    }
}

/// Boundary to whatever judges content.
///
/// The response is deliberately untyped: it is expected to be a JSON array
/// with one verdict object per input, but nothing past this trait may rely
/// on that without normalizing first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze_raw(&self, contents: &[String]) -> Result<serde_json::Value, AnalyzerError>;
}
