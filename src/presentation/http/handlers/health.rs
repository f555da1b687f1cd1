use crate::presentation::http::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    queue_store: &'static str,
    storage_backend: String,
    version: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_status = match state.queue.ping().await {
        Ok(()) => "up",
        Err(e) => {
            tracing::error!("Health check failed: queue store unreachable: {}", e);
            "down"
        }
    };

    let status = if store_status == "up" {
        "healthy"
    } else {
        "unhealthy"
    };

    let response = HealthResponse {
        status,
        queue_store: store_status,
        storage_backend: state.config.storage_backend.to_string(),
        version: env!("CARGO_PKG_VERSION"),
    };

    let code = if status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(response))
}
