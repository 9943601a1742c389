use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cookie attributes attached to a session.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct SessionCookie {
    pub path: Option<String>,
    pub http_only: bool,
    pub max_age_secs: Option<i64>,
}

/// Per-client session state. Authentication is the explicit `user` field
/// rather than something inferred from the cookie.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WebSession {
    pub id: String,
    pub cookie: SessionCookie,
    pub user: Option<String>,
}

impl WebSession {
    /// A fresh, logged-out session with an empty cookie.
    pub fn empty() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            cookie: SessionCookie::default(),
            user: None,
        }
    }

    pub fn with_cookie(cookie: SessionCookie) -> Self {
        Self {
            cookie,
            ..Self::empty()
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

impl Default for WebSession {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_session() {
        let session = WebSession::empty();

        assert!(!session.is_authenticated());
        assert_eq!(session.cookie, SessionCookie::default());
        assert_ne!(session.id, WebSession::empty().id);
    }

    #[test]
    fn test_with_cookie() {
        let cookie = SessionCookie {
            path: Some("/".to_string()),
            http_only: true,
            max_age_secs: Some(3600),
        };
        let session = WebSession::with_cookie(cookie.clone());

        assert_eq!(session.cookie, cookie);
        assert!(session.user.is_none());
    }
}
