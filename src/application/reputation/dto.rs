use serde::{Deserialize, Serialize};
use ts_rs::TS;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, TS, Validate)]
#[ts(export)]
pub struct ManualOverrideRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VisibilityRequest {
    pub visibility_public: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecomputeResponse {
    pub user_id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecomputeSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_users: Vec<String>,
}
