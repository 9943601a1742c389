pub mod memory_store;
pub mod mongo_store;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::shared::models::User;
use crate::system::config::{DatabaseConfig, StoreBackend};

pub use memory_store::MemoryStore;
pub use mongo_store::MongoStore;

pub type StoreHandle = Arc<dyn Store>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    #[error("Store connection is closed")]
    Closed,
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

/// Persistence for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`StoreError::Duplicate`] when the username is taken.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    /// Users ordered by username, optionally restricted to a username prefix.
    async fn list_users(&self, prefix: Option<&str>) -> Result<Vec<User>, StoreError>;
    /// Returns false when no user has `user.id`.
    async fn replace_user(&self, user: &User) -> Result<bool, StoreError>;
    async fn delete_user(&self, id: &str) -> Result<bool, StoreError>;
}

/// A database handle: user storage plus the lifecycle operations tests rely on.
#[async_trait]
pub trait Store: UserRepository {
    fn database_name(&self) -> &str;
    async fn drop_database(&self) -> Result<(), StoreError>;
    async fn close(&self) -> Result<(), StoreError>;
    async fn health_check(&self) -> bool;
}

/// Opens the store selected by `config.backend`.
pub async fn open_store(config: &DatabaseConfig) -> Result<StoreHandle> {
    let store: StoreHandle = match config.backend {
        StoreBackend::MongoDb => Arc::new(MongoStore::connect(config).await?),
        StoreBackend::Memory => Arc::new(MemoryStore::new(&config.database)),
    };

    info!(
        backend = ?config.backend,
        database = store.database_name(),
        "Store opened"
    );

    Ok(store)
}
