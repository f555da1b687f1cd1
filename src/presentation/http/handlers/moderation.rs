use crate::application::moderation::{
    dto::{LogsQuery, PrecheckRequest, QueueListQuery, SubmissionResponse, SubmitContentRequest},
    processor::BatchReport,
};
use crate::domain::moderation::{entity::ModerationQueueItem, log::ModerationLogEntry};
use crate::domain::shared::pagination::{PaginatedResponse, PaginationRequest};
use crate::infrastructure::security::content_precheck::{PrecheckOutcome, precheck};
use crate::presentation::http::{errors::AppError, state::AppState};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

pub async fn run_precheck(Json(request): Json<PrecheckRequest>) -> Json<PrecheckOutcome> {
    Json(precheck(&request.content))
}

pub async fn submit_content(
    State(state): State<AppState>,
    Json(request): Json<SubmitContentRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    request.validate()?;
    let response = state.moderation.submit(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_queue(
    State(state): State<AppState>,
    Query(query): Query<QueueListQuery>,
) -> Result<Json<PaginatedResponse<ModerationQueueItem>>, AppError> {
    let page = PaginationRequest::new(query.limit, query.offset);
    Ok(Json(state.moderation.list_queue(query.status, page).await?))
}

pub async fn get_queue_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ModerationQueueItem>, AppError> {
    Ok(Json(state.moderation.get_item(id).await?))
}

/// Manual trigger for one cycle, bounded by the short HTTP budget.
pub async fn process_now(State(state): State<AppState>) -> Result<Json<BatchReport>, AppError> {
    let budget = Duration::from_secs(state.config.moderation_manual_budget_seconds);
    let report = state.processor.process_batch(budget).await?;
    Ok(Json(report))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<ModerationLogEntry>>, AppError> {
    Ok(Json(state.moderation.recent_logs(query.limit).await?))
}
