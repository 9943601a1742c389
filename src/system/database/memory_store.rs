use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Store, StoreError, UserRepository};
use crate::shared::models::User;

/// In-process store keyed by user id. Used for local runs and tests that
/// should not need a MongoDB server.
pub struct MemoryStore {
    database_name: String,
    users: RwLock<HashMap<String, User>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new(database_name: &str) -> Self {
        Self {
            database_name: database_name.to_string(),
            users: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.ensure_open()?;
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }
        if users.contains_key(&user.id) {
            return Err(StoreError::Duplicate(format!("_id {}", user.id)));
        }

        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.ensure_open()?;
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.ensure_open()?;
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self, prefix: Option<&str>) -> Result<Vec<User>, StoreError> {
        self.ensure_open()?;
        let users = self.users.read().await;

        let mut matched: Vec<User> = users
            .values()
            .filter(|u| prefix.is_none_or(|p| u.username.starts_with(p)))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(matched)
    }

    async fn replace_user(&self, user: &User) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let mut users = self.users.write().await;

        if !users.contains_key(&user.id) {
            return Ok(false);
        }
        if users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(StoreError::Duplicate(format!("username {}", user.username)));
        }

        users.insert(user.id.clone(), user.clone());
        Ok(true)
    }

    async fn delete_user(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        Ok(self.users.write().await.remove(id).is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn database_name(&self) -> &str {
        &self.database_name
    }

    async fn drop_database(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.users.write().await.clear();
        debug!(database = %self.database_name, "Dropped in-memory database");
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("hash-{}", name))
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = MemoryStore::new("test-db");
        let alice = user("alice");
        store.insert_user(&alice).await.unwrap();

        let by_name = store.find_user_by_username("alice").await.unwrap();
        assert_eq!(by_name, Some(alice.clone()));

        let by_id = store.find_user_by_id(&alice.id).await.unwrap();
        assert_eq!(by_id, Some(alice));

        assert!(store.find_user_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new("test-db");
        store.insert_user(&user("alice")).await.unwrap();

        let result = store.insert_user(&user("alice")).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_filtered() {
        let store = MemoryStore::new("test-db");
        for name in ["bob", "alice", "albert"] {
            store.insert_user(&user(name)).await.unwrap();
        }

        let all: Vec<String> = store
            .list_users(None)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(all, vec!["albert", "alice", "bob"]);

        let al = store.list_users(Some("al")).await.unwrap();
        assert_eq!(al.len(), 2);
    }

    #[tokio::test]
    async fn test_replace_rejects_taken_username() {
        let store = MemoryStore::new("test-db");
        let alice = user("alice");
        let mut bob = user("bob");
        store.insert_user(&alice).await.unwrap();
        store.insert_user(&bob).await.unwrap();

        bob.username = "alice".to_string();
        let result = store.replace_user(&bob).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));

        let ghost = user("ghost");
        assert!(!store.replace_user(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_and_close() {
        let store = MemoryStore::new("test-db");
        let alice = user("alice");
        store.insert_user(&alice).await.unwrap();

        store.drop_database().await.unwrap();
        assert!(store.list_users(None).await.unwrap().is_empty());

        store.close().await.unwrap();
        assert!(!store.health_check().await);
        assert!(matches!(
            store.find_user_by_id(&alice.id).await,
            Err(StoreError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new("test-db");
        let alice = user("alice");
        store.insert_user(&alice).await.unwrap();

        assert!(store.delete_user(&alice.id).await.unwrap());
        assert!(!store.delete_user(&alice.id).await.unwrap());
    }
}
