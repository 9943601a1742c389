use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::domains::user::handlers::{
    create_user, delete_user, get_session_user, get_user, get_users, log_in, log_out, update_user,
};
use crate::domains::user::state::UserState;

pub const API_VERSION: &str = "1.0";

pub fn build_router(state: Arc<UserState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/session", get(get_session_user))
        .route(
            "/api/users",
            get(get_users)
                .post(create_user)
                .patch(update_user)
                .delete(delete_user),
        )
        .route("/api/users/{username}", get(get_user))
        .route("/api/login", post(log_in))
        .route("/api/logout", post(log_out))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

// Health check handler
async fn health_handler(
    State(state): State<Arc<UserState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let shared = &state.shared_state;
    let healthy = shared.store.health_check().await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "environment": shared.config.environment,
            "database": shared.store.database_name(),
            "api_version": API_VERSION
        })),
    )
}
