use axum::{
    Json,
    http::{HeaderMap, HeaderName, HeaderValue, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use headers::{Cookie, HeaderMapExt};
use serde::Serialize;
use tracing::debug;

use crate::domains::user::services::SessionTokenError;
use crate::domains::user::state::{SessionCommit, UserState};
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::{SessionCookie, WebSession};

/// Resolves the request's session from the signed cookie. Missing, forged,
/// expired or unknown cookies all fall back to a fresh session.
pub async fn load_session(state: &UserState, headers: &HeaderMap) -> WebSession {
    let Some(token) = session_token(headers, state.cookie_name()) else {
        return new_session(state);
    };

    let claims = match state.session_tokens.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Ignoring invalid session cookie");
            return new_session(state);
        }
    };

    match state.sessions.load(&claims.sid).await {
        Some(session) => session,
        None => {
            debug!(session_id = %claims.sid, "Session cookie refers to unknown session");
            new_session(state)
        }
    }
}

/// Writes back the session a route produced from `original` and builds the
/// matching `Set-Cookie` header: a fresh signed id when the session was stored,
/// an expired cookie when it was removed, none when nothing changed.
pub async fn commit_session(
    state: &UserState,
    original: &WebSession,
    session: WebSession,
) -> AppResult<Option<(HeaderName, HeaderValue)>> {
    let (token, expires_at) = state.session_tokens.issue(&session.id)?;
    let cookie = match state.sessions.commit(original, &session, expires_at).await? {
        SessionCommit::Unchanged => return Ok(None),
        SessionCommit::Stored => format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            state.cookie_name(),
            token,
            state.session_tokens.max_age_secs()
        ),
        SessionCommit::Removed => format!(
            "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
            state.cookie_name()
        ),
    };
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Token(SessionTokenError::TokenCreation(e.to_string())))?;
    Ok(Some((SET_COOKIE, value)))
}

/// Commits the session on success and returns the route result as JSON.
pub async fn respond<T: Serialize>(
    state: &UserState,
    original: &WebSession,
    session: WebSession,
    result: AppResult<T>,
) -> AppResult<Response> {
    let body = result?;
    let response = match commit_session(state, original, session).await? {
        Some(set_cookie) => ([set_cookie], Json(body)).into_response(),
        None => Json(body).into_response(),
    };
    Ok(response)
}

fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .typed_get::<Cookie>()
        .and_then(|cookie| cookie.get(cookie_name).map(str::to_string))
}

fn new_session(state: &UserState) -> WebSession {
    WebSession::with_cookie(SessionCookie {
        path: Some("/".to_string()),
        http_only: true,
        max_age_secs: Some(state.session_tokens.max_age_secs()),
    })
}
