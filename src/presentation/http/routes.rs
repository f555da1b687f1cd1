use super::{
    handlers::{health, moderation, reputation, ws},
    middleware::auth::{require_admin, require_service},
    middleware::request_id::request_id_middleware,
    state::AppState,
};
use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/moderation/queue",
            get(moderation::list_queue),
        )
        .route(
            "/api/v1/admin/moderation/queue/{id}",
            get(moderation::get_queue_item),
        )
        .route(
            "/api/v1/admin/moderation/process",
            post(moderation::process_now),
        )
        .route("/api/v1/admin/moderation/logs", get(moderation::list_logs))
        .route(
            "/api/v1/admin/moderation/stream",
            get(ws::moderation_stream),
        )
        .route(
            "/api/v1/admin/reputation/recompute-all",
            post(reputation::recompute_all),
        )
        .route(
            "/api/v1/admin/reputation/{user_id}/recompute",
            post(reputation::recompute_user),
        )
        .route(
            "/api/v1/admin/reputation/{user_id}/override",
            post(reputation::override_score),
        )
        .route(
            "/api/v1/admin/reputation/{user_id}/visibility",
            put(reputation::set_visibility),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    let service_routes = Router::new()
        .route(
            "/api/v1/moderation/precheck",
            post(moderation::run_precheck),
        )
        .route(
            "/api/v1/moderation/submissions",
            post(moderation::submit_content),
        )
        .route(
            "/api/v1/reputation/{user_id}",
            get(reputation::get_reputation),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_service,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(service_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}
