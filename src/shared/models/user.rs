use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored account. The password is only ever kept as a bcrypt hash.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    pub password_hash: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            username,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// Public projection of a user, safe to return from routes
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        (&user).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_has_unique_id() {
        let a = User::new("alice".to_string(), "hash".to_string());
        let b = User::new("alice".to_string(), "hash".to_string());

        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
    }

    #[test]
    fn test_dto_hides_password_hash() {
        let user = User::new("bob".to_string(), "secret-hash".to_string());
        let dto = UserDto::from(&user);
        let json = serde_json::to_value(&dto).unwrap();

        assert_eq!(json["username"], "bob");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn test_bson_uses_underscore_id() {
        let user = User::new("carol".to_string(), "hash".to_string());
        let doc = bson::to_document(&user).unwrap();

        assert_eq!(doc.get_str("_id").unwrap(), user.id);
        assert!(doc.get_datetime("created_at").is_ok());
    }
}
