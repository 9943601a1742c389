use tracing::info;

use crate::domains::user::dto::{RouteMessage, UserUpdate};
use crate::domains::user::services::{PasswordConfig, PasswordService, SessionService, UserService};
use crate::shared::error::AppResult;
use crate::shared::models::{UserDto, WebSession};
use crate::system::database::StoreHandle;

/// Application routes, callable directly with a session or through HTTP handlers.
pub struct Routes {
    users: UserService,
    sessions: SessionService,
}

impl Routes {
    pub fn new(store: StoreHandle, password_config: PasswordConfig) -> Self {
        Self {
            users: UserService::new(store, PasswordService::new(password_config)),
            sessions: SessionService::new(),
        }
    }

    pub async fn get_session_user(&self, session: &WebSession) -> AppResult<UserDto> {
        let user_id = self.sessions.get_user(session)?;
        self.users.get_by_id(&user_id).await
    }

    pub async fn get_users(&self, prefix: Option<&str>) -> AppResult<Vec<UserDto>> {
        self.users.get_users(prefix).await
    }

    pub async fn get_user(&self, username: &str) -> AppResult<UserDto> {
        self.users.get_by_username(username).await
    }

    /// Registration is only possible from a logged-out session.
    pub async fn create_user(
        &self,
        session: &mut WebSession,
        username: &str,
        password: &str,
    ) -> AppResult<RouteMessage> {
        self.sessions.is_logged_out(session)?;
        let user = self.users.create(username, password).await?;
        Ok(RouteMessage::with_user("Created user successfully!", user))
    }

    pub async fn update_user(
        &self,
        session: &mut WebSession,
        update: UserUpdate,
    ) -> AppResult<RouteMessage> {
        let user_id = self.sessions.get_user(session)?;
        let user = self.users.update(&user_id, update).await?;
        Ok(RouteMessage::with_user("Updated user successfully!", user))
    }

    pub async fn delete_user(&self, session: &mut WebSession) -> AppResult<RouteMessage> {
        let user_id = self.sessions.get_user(session)?;
        self.users.delete(&user_id).await?;
        self.sessions.end(session)?;
        Ok(RouteMessage::new("You are deleted!"))
    }

    pub async fn log_in(
        &self,
        session: &mut WebSession,
        username: &str,
        password: &str,
    ) -> AppResult<RouteMessage> {
        self.sessions.is_logged_out(session)?;
        let user = self.users.authenticate(username, password).await?;
        self.sessions.start(session, &user.id)?;
        info!(session_id = %session.id, username, "Logged in");
        Ok(RouteMessage::with_user("Logged in!", user))
    }

    pub async fn log_out(&self, session: &mut WebSession) -> AppResult<RouteMessage> {
        self.sessions.end(session)?;
        Ok(RouteMessage::new("Logged out!"))
    }
}
