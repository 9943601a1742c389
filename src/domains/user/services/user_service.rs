use tracing::{debug, info};

use crate::domains::user::dto::UserUpdate;
use crate::domains::user::services::PasswordService;
use crate::shared::error::{AppError, AppResult};
use crate::shared::models::{User, UserDto};
use crate::system::database::{StoreError, StoreHandle};

/// Account management: creation, lookup, credential checks, updates.
pub struct UserService {
    store: StoreHandle,
    password_service: PasswordService,
}

impl UserService {
    pub fn new(store: StoreHandle, password_service: PasswordService) -> Self {
        Self {
            store,
            password_service,
        }
    }

    pub async fn create(&self, username: &str, password: &str) -> AppResult<UserDto> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::BadValues(
                "Username and password must be non-empty!".to_string(),
            ));
        }
        self.ensure_username_available(username).await?;

        let password_hash = self.password_service.hash_password(password)?;
        let user = User::new(username.to_string(), password_hash);

        self.store
            .insert_user(&user)
            .await
            .map_err(|e| duplicate_as_conflict(e, username))?;

        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user.into())
    }

    /// Returns the user when `password` matches. Unknown users and wrong
    /// passwords produce the same error.
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<UserDto> {
        if username.is_empty() || password.is_empty() {
            return Err(AppError::BadValues(
                "Username and password must be non-empty!".to_string(),
            ));
        }

        let incorrect = || AppError::Unauthenticated("Username or password is incorrect.".to_string());

        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(incorrect)?;

        if !self
            .password_service
            .verify_password(password, &user.password_hash)?
        {
            debug!(username, "Password mismatch");
            return Err(incorrect());
        }

        Ok(user.into())
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<UserDto> {
        self.store
            .find_user_by_id(id)
            .await?
            .map(UserDto::from)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} does not exist!", id)))
    }

    pub async fn get_by_username(&self, username: &str) -> AppResult<UserDto> {
        self.store
            .find_user_by_username(username)
            .await?
            .map(UserDto::from)
            .ok_or_else(|| AppError::NotFound(format!("User {} does not exist!", username)))
    }

    pub async fn get_users(&self, prefix: Option<&str>) -> AppResult<Vec<UserDto>> {
        let users = self.store.list_users(prefix).await?;
        Ok(users.into_iter().map(UserDto::from).collect())
    }

    pub async fn update(&self, id: &str, update: UserUpdate) -> AppResult<UserDto> {
        let mut user = self
            .store
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} does not exist!", id)))?;

        if let Some(username) = update.username {
            if username.is_empty() {
                return Err(AppError::BadValues("Username must be non-empty!".to_string()));
            }
            if username != user.username {
                self.ensure_username_available(&username).await?;
                user.username = username;
            }
        }
        if let Some(password) = update.password {
            user.password_hash = self.password_service.hash_password(&password)?;
        }
        user.touch();

        let replaced = self
            .store
            .replace_user(&user)
            .await
            .map_err(|e| duplicate_as_conflict(e, &user.username))?;
        if !replaced {
            return Err(AppError::NotFound(format!("User with id {} does not exist!", id)));
        }

        info!(user_id = %user.id, "User updated");
        Ok(user.into())
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.store.delete_user(id).await? {
            return Err(AppError::NotFound(format!("User with id {} does not exist!", id)));
        }
        info!(user_id = %id, "User deleted");
        Ok(())
    }

    async fn ensure_username_available(&self, username: &str) -> AppResult<()> {
        if self.store.find_user_by_username(username).await?.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "User with username {} already exists!",
                username
            )));
        }
        Ok(())
    }
}

fn duplicate_as_conflict(err: StoreError, username: &str) -> AppError {
    match err {
        StoreError::Duplicate(_) => AppError::AlreadyExists(format!(
            "User with username {} already exists!",
            username
        )),
        other => AppError::Store(other),
    }
}
