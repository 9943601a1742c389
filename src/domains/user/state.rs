use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::domains::user::routes::Routes;
use crate::domains::user::services::{SessionTokenConfig, SessionTokenService};
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::WebSession;
use crate::shared::state::SharedState;

struct StoredSession {
    session: WebSession,
    expires_at: DateTime<Utc>,
}

impl StoredSession {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// What [`SessionRegistry::commit`] did with a session after a route ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommit {
    /// Neither the id nor the user changed; nothing was written.
    Unchanged,
    /// The authenticated session was stored under its (possibly new) id.
    Stored,
    /// The session is no longer authenticated and its record is gone.
    Removed,
}

/// Server-side records of authenticated sessions, keyed by session id.
/// Logged-out sessions are never kept and entries past their expiry are
/// dropped on every write.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, StoredSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, session_id: &str) -> Option<WebSession> {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .get(session_id)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.session.clone())
    }

    /// Stores an authenticated session until `expires_at`. Logged-out sessions
    /// are removed instead.
    pub async fn save(&self, session: WebSession, expires_at: DateTime<Utc>) {
        let mut sessions = self.sessions.write().await;
        prune(&mut sessions, Utc::now());
        if session.is_authenticated() {
            sessions.insert(
                session.id.clone(),
                StoredSession {
                    session,
                    expires_at,
                },
            );
        } else {
            sessions.remove(&session.id);
        }
    }

    /// Writes back `updated`, the result of a route applied to `original`.
    ///
    /// Nothing is written when the route left the id and user alone. Storing an
    /// authenticated session requires the record for `original.id` to still
    /// hold `original.user`; otherwise another request changed it first and the
    /// write is refused with [`AppError::Conflict`]. The check and the write
    /// happen under one write lock.
    pub async fn commit(
        &self,
        original: &WebSession,
        updated: &WebSession,
        expires_at: DateTime<Utc>,
    ) -> AppResult<SessionCommit> {
        if original.id == updated.id && original.user == updated.user {
            return Ok(SessionCommit::Unchanged);
        }

        let mut sessions = self.sessions.write().await;
        let now = Utc::now();
        prune(&mut sessions, now);

        if !updated.is_authenticated() {
            sessions.remove(&original.id);
            sessions.remove(&updated.id);
            debug!(session_id = %original.id, "Session record removed");
            return Ok(SessionCommit::Removed);
        }

        let current = sessions
            .get(&original.id)
            .and_then(|stored| stored.session.user.as_deref());
        if current != original.user.as_deref() {
            warn!(session_id = %original.id, "Session changed by a concurrent request");
            return Err(AppError::Conflict(
                "Session was changed by another request".to_string(),
            ));
        }

        sessions.remove(&original.id);
        sessions.insert(
            updated.id.clone(),
            StoredSession {
                session: updated.clone(),
                expires_at,
            },
        );
        debug!(session_id = %updated.id, "Session record stored");
        Ok(SessionCommit::Stored)
    }

    pub async fn remove(&self, session_id: &str) -> Option<WebSession> {
        self.sessions
            .write()
            .await
            .remove(session_id)
            .map(|stored| stored.session)
    }

    /// Drops every expired record and returns how many were dropped.
    pub async fn prune_expired(&self) -> usize {
        prune(&mut *self.sessions.write().await, Utc::now())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn prune(sessions: &mut HashMap<String, StoredSession>, now: DateTime<Utc>) -> usize {
    let before = sessions.len();
    sessions.retain(|_, stored| stored.is_live(now));
    before - sessions.len()
}

/// State for the user and session endpoints
pub struct UserState {
    pub shared_state: Arc<SharedState>,
    pub routes: Routes,
    pub session_tokens: SessionTokenService,
    pub sessions: SessionRegistry,
}

impl UserState {
    pub fn new(shared_state: Arc<SharedState>) -> Self {
        let config = &shared_state.config;
        let routes = Routes::new(
            shared_state.store.clone(),
            config.password.clone(),
        );
        let session_tokens =
            SessionTokenService::new(SessionTokenConfig::from_session_config(&config.session));

        Self {
            routes,
            session_tokens,
            sessions: SessionRegistry::new(),
            shared_state,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.shared_state.config.session.cookie_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn in_one_hour() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    fn logged_in(user_id: &str) -> WebSession {
        let mut session = WebSession::empty();
        session.user = Some(user_id.to_string());
        session
    }

    #[tokio::test]
    async fn test_registry_round_trip() {
        let registry = SessionRegistry::new();
        let session = logged_in("user-1");

        registry.save(session.clone(), in_one_hour()).await;
        assert_eq!(registry.load(&session.id).await, Some(session.clone()));
        assert_eq!(registry.len().await, 1);

        registry.remove(&session.id).await;
        assert!(registry.is_empty().await);
        assert!(registry.load(&session.id).await.is_none());
    }

    #[tokio::test]
    async fn test_logged_out_sessions_are_not_kept() {
        let registry = SessionRegistry::new();

        for _ in 0..50 {
            let anonymous = WebSession::empty();
            registry.save(anonymous.clone(), in_one_hour()).await;
            let outcome = registry
                .commit(&anonymous, &anonymous, in_one_hour())
                .await
                .unwrap();
            assert_eq!(outcome, SessionCommit::Unchanged);
        }

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_expired_sessions_are_pruned() {
        let registry = SessionRegistry::new();
        let stale = logged_in("user-1");
        registry
            .save(stale.clone(), Utc::now() - Duration::seconds(1))
            .await;

        assert!(registry.load(&stale.id).await.is_none());
        assert_eq!(registry.prune_expired().await, 1);
        assert!(registry.is_empty().await);

        registry
            .save(stale.clone(), Utc::now() - Duration::seconds(1))
            .await;
        let fresh = logged_in("user-2");
        registry.save(fresh.clone(), in_one_hour()).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.load(&fresh.id).await.is_some());
    }

    #[tokio::test]
    async fn test_login_replaces_anonymous_id() {
        let registry = SessionRegistry::new();
        let anonymous = WebSession::empty();
        let mut session = anonymous.clone();
        session.id = "rotated".to_string();
        session.user = Some("user-1".to_string());

        let outcome = registry
            .commit(&anonymous, &session, in_one_hour())
            .await
            .unwrap();
        assert_eq!(outcome, SessionCommit::Stored);
        assert!(registry.load(&anonymous.id).await.is_none());
        assert_eq!(registry.load("rotated").await, Some(session));
    }

    #[tokio::test]
    async fn test_stale_write_cannot_revive_logged_out_session() {
        let registry = SessionRegistry::new();
        let session = logged_in("user-1");
        registry.save(session.clone(), in_one_hour()).await;

        // Two requests carrying the same cookie load the same record.
        let first = registry.load(&session.id).await.unwrap();
        let second = registry.load(&session.id).await.unwrap();

        let mut logged_out = first.clone();
        logged_out.user = None;
        let outcome = registry
            .commit(&first, &logged_out, in_one_hour())
            .await
            .unwrap();
        assert_eq!(outcome, SessionCommit::Removed);

        // The slower request leaves the session alone, so nothing is written back.
        let outcome = registry
            .commit(&second, &second.clone(), in_one_hour())
            .await
            .unwrap();
        assert_eq!(outcome, SessionCommit::Unchanged);
        assert!(registry.load(&session.id).await.is_none());

        // A changed write based on the stale copy is refused.
        let mut switched = second.clone();
        switched.user = Some("user-2".to_string());
        assert!(matches!(
            registry.commit(&second, &switched, in_one_hour()).await,
            Err(AppError::Conflict(_))
        ));
        assert!(registry.is_empty().await);
    }
}
