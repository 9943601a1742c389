use tracing::debug;
use uuid::Uuid;

use crate::shared::error::{AppError, AppResult};
use crate::shared::models::WebSession;

/// Login state transitions over a [`WebSession`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionService;

impl SessionService {
    pub fn new() -> Self {
        Self
    }

    /// Marks the session as logged in as `user_id` under a fresh session id, so an
    /// id handed out before login never identifies the authenticated session.
    /// A logged-in session cannot start again.
    pub fn start(&self, session: &mut WebSession, user_id: &str) -> AppResult<()> {
        self.is_logged_out(session)?;
        session.id = Uuid::new_v4().to_string();
        session.user = Some(user_id.to_string());
        debug!(session_id = %session.id, user_id, "Session started");
        Ok(())
    }

    pub fn end(&self, session: &mut WebSession) -> AppResult<()> {
        self.is_logged_in(session)?;
        session.user = None;
        debug!(session_id = %session.id, "Session ended");
        Ok(())
    }

    pub fn get_user(&self, session: &WebSession) -> AppResult<String> {
        self.is_logged_in(session)?;
        session
            .user
            .clone()
            .ok_or_else(|| AppError::Unauthenticated("Must be logged in!".to_string()))
    }

    pub fn is_logged_in(&self, session: &WebSession) -> AppResult<()> {
        if !session.is_authenticated() {
            return Err(AppError::Unauthenticated("Must be logged in!".to_string()));
        }
        Ok(())
    }

    pub fn is_logged_out(&self, session: &WebSession) -> AppResult<()> {
        if session.is_authenticated() {
            return Err(AppError::NotAllowed("Must be logged out!".to_string()));
        }
        Ok(())
    }
}
