use serde::{Deserialize, Serialize};

use crate::shared::models::UserDto;

// Body of create-user and login requests
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

// Partial user update; absent fields are left unchanged
#[derive(Debug, Deserialize, Default, Clone)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UsersQuery {
    pub prefix: Option<String>,
}

/// Success payload of state-changing routes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RouteMessage {
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDto>,
}

impl RouteMessage {
    pub fn new(msg: &str) -> Self {
        Self {
            msg: msg.to_string(),
            user: None,
        }
    }

    pub fn with_user(msg: &str, user: UserDto) -> Self {
        Self {
            msg: msg.to_string(),
            user: Some(user),
        }
    }
}
