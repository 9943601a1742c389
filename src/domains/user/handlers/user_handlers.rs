use axum::{
    extract::{Json, Path, Query, State},
    http::HeaderMap,
    response::{Json as JsonResponse, Response},
};
use std::sync::Arc;

use super::session_support::{load_session, respond};
use crate::domains::user::dto::{CredentialsRequest, UserUpdate, UsersQuery};
use crate::domains::user::state::UserState;
use crate::shared::error::AppResult;
use crate::shared::models::UserDto;

// Current session's user
pub async fn get_session_user(
    State(state): State<Arc<UserState>>,
    headers: HeaderMap,
) -> AppResult<JsonResponse<UserDto>> {
    let session = load_session(&state, &headers).await;
    let user = state.routes.get_session_user(&session).await?;
    Ok(JsonResponse(user))
}

pub async fn get_users(
    State(state): State<Arc<UserState>>,
    Query(query): Query<UsersQuery>,
) -> AppResult<JsonResponse<Vec<UserDto>>> {
    let users = state.routes.get_users(query.prefix.as_deref()).await?;
    Ok(JsonResponse(users))
}

pub async fn get_user(
    State(state): State<Arc<UserState>>,
    Path(username): Path<String>,
) -> AppResult<JsonResponse<UserDto>> {
    let user = state.routes.get_user(&username).await?;
    Ok(JsonResponse(user))
}

pub async fn create_user(
    State(state): State<Arc<UserState>>,
    headers: HeaderMap,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let mut session = load_session(&state, &headers).await;
    let original = session.clone();
    let result = state
        .routes
        .create_user(&mut session, &payload.username, &payload.password)
        .await;
    respond(&state, &original, session, result).await
}

pub async fn update_user(
    State(state): State<Arc<UserState>>,
    headers: HeaderMap,
    Json(update): Json<UserUpdate>,
) -> AppResult<Response> {
    let mut session = load_session(&state, &headers).await;
    let original = session.clone();
    let result = state.routes.update_user(&mut session, update).await;
    respond(&state, &original, session, result).await
}

pub async fn delete_user(
    State(state): State<Arc<UserState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let mut session = load_session(&state, &headers).await;
    let original = session.clone();
    let result = state.routes.delete_user(&mut session).await;
    respond(&state, &original, session, result).await
}

pub async fn log_in(
    State(state): State<Arc<UserState>>,
    headers: HeaderMap,
    Json(payload): Json<CredentialsRequest>,
) -> AppResult<Response> {
    let mut session = load_session(&state, &headers).await;
    let original = session.clone();
    let result = state
        .routes
        .log_in(&mut session, &payload.username, &payload.password)
        .await;
    respond(&state, &original, session, result).await
}

pub async fn log_out(
    State(state): State<Arc<UserState>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let mut session = load_session(&state, &headers).await;
    let original = session.clone();
    let result = state.routes.log_out(&mut session).await;
    respond(&state, &original, session, result).await
}
