use crate::application::reputation::dto::{
    ManualOverrideRequest, RecomputeResponse, RecomputeSummary, VisibilityRequest,
};
use crate::domain::reputation::entity::UserReputation;
use crate::presentation::http::{errors::AppError, middleware::auth::Claims, state::AppState};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use validator::Validate;

/// Private records are only visible to admins.
pub async fn get_reputation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<Json<UserReputation>, AppError> {
    let reputation = state.reputation.get_or_init(&user_id).await?;
    if !reputation.visibility_public && !claims.is_admin() {
        return Err(AppError::NotFound(format!("reputation for {}", user_id)));
    }
    Ok(Json(reputation))
}

pub async fn recompute_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<RecomputeResponse>, AppError> {
    let score = state.reputation.recompute(&user_id).await?;
    Ok(Json(RecomputeResponse { user_id, score }))
}

pub async fn recompute_all(
    State(state): State<AppState>,
) -> Result<Json<RecomputeSummary>, AppError> {
    Ok(Json(state.reputation.recompute_all().await?))
}

pub async fn override_score(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
    Json(request): Json<ManualOverrideRequest>,
) -> Result<Json<UserReputation>, AppError> {
    request.validate()?;
    let reputation = state
        .reputation
        .manual_override(&user_id, request.score, &claims.sub, &request.reason)
        .await?;
    Ok(Json(reputation))
}

pub async fn set_visibility(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<VisibilityRequest>,
) -> Result<Json<UserReputation>, AppError> {
    let reputation = state
        .reputation
        .set_visibility(&user_id, request.visibility_public)
        .await?;
    Ok(Json(reputation))
}
