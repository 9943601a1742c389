//! Test-mode startup: forces the `TEST` flag, refuses to run against anything
//! but the test database, and resets it to a known set of users.

use std::env;
use std::sync::{Mutex, PoisonError};
use tracing::info;

use crate::domains::user::routes::Routes;
use crate::shared::error::AppError;
use crate::shared::models::WebSession;
use crate::system::config::{AppConfig, ConfigError, TEST_DATABASE_NAME};
use crate::system::database::{Store, StoreError, StoreHandle, open_store};

pub const TEST_FLAG: &str = "TEST";

/// Accounts present after every [`TestHarness::reset`].
pub const SEED_USERS: [(&str, &str); 2] = [("alice", "alice123"), ("bob", "bob123")];

static TEST_CONFIG: Mutex<Option<AppConfig>> = Mutex::new(None);

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Not connected to test database (connected to {actual})")]
    NotTestDatabase { actual: String },
    #[error("Configuration failed: {0}")]
    Config(#[from] ConfigError),
    #[error("Failed to open store: {0}")]
    Open(anyhow::Error),
    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
    #[error("Seeding failed: {0}")]
    Seed(#[from] AppError),
}

/// Sets `TEST=true` and loads configuration. Runs once per process; later
/// calls return the same config.
pub fn enable_test_mode() -> Result<AppConfig, BootstrapError> {
    let mut cached = TEST_CONFIG.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(config) = cached.as_ref() {
        return Ok(config.clone());
    }

    // SAFETY: guarded by TEST_CONFIG; no other thread reads the environment
    // through this module until the lock is released.
    unsafe {
        env::set_var(TEST_FLAG, "true");
    }
    let config = AppConfig::load()?;
    info!(
        environment = %config.environment,
        database = %config.database.database,
        "Test mode enabled"
    );

    *cached = Some(config.clone());
    Ok(config)
}

/// Fails unless `store` is the reserved test database.
pub fn ensure_test_database(store: &dyn Store) -> Result<(), BootstrapError> {
    let actual = store.database_name();
    if actual != TEST_DATABASE_NAME {
        return Err(BootstrapError::NotTestDatabase {
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// A guarded store plus routes, with per-test reset and final teardown.
pub struct TestHarness {
    pub config: AppConfig,
    pub store: StoreHandle,
    pub routes: Routes,
}

impl TestHarness {
    /// Enables test mode, connects to the configured store and checks it is the test database.
    pub async fn bootstrap() -> Result<Self, BootstrapError> {
        let config = enable_test_mode()?;
        Self::with_config(config).await
    }

    pub async fn with_config(config: AppConfig) -> Result<Self, BootstrapError> {
        let store = open_store(&config.database)
            .await
            .map_err(BootstrapError::Open)?;
        Self::from_store(config, store)
    }

    pub fn from_store(config: AppConfig, store: StoreHandle) -> Result<Self, BootstrapError> {
        ensure_test_database(store.as_ref())?;
        let routes = Routes::new(store.clone(), config.password.clone());
        Ok(Self {
            config,
            store,
            routes,
        })
    }

    /// A fresh logged-out session.
    pub fn empty_session() -> WebSession {
        WebSession::empty()
    }

    /// Drops the test database and re-creates the seed users.
    pub async fn reset(&self) -> Result<(), BootstrapError> {
        self.store.drop_database().await?;
        for (username, password) in SEED_USERS {
            self.routes
                .create_user(&mut Self::empty_session(), username, password)
                .await?;
        }
        Ok(())
    }

    /// Closes the database client.
    pub async fn teardown(self) -> Result<(), BootstrapError> {
        self.store.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::database::MemoryStore;
    use std::sync::Arc;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.test_mode = true;
        config.database.database = TEST_DATABASE_NAME.to_string();
        config.password.bcrypt_cost = 4;
        config
    }

    #[test]
    fn test_guard_rejects_other_databases() {
        let store = MemoryStore::new("production");
        assert!(matches!(
            ensure_test_database(&store),
            Err(BootstrapError::NotTestDatabase { actual }) if actual == "production"
        ));

        let store = MemoryStore::new(TEST_DATABASE_NAME);
        assert!(ensure_test_database(&store).is_ok());
    }

    #[test]
    fn test_harness_refuses_non_test_store() {
        let store: StoreHandle = Arc::new(MemoryStore::new("session-api"));
        assert!(TestHarness::from_store(test_config(), store).is_err());
    }

    #[tokio::test]
    async fn test_reset_seeds_users() {
        let store: StoreHandle = Arc::new(MemoryStore::new(TEST_DATABASE_NAME));
        let harness = TestHarness::from_store(test_config(), store).unwrap();

        harness.reset().await.unwrap();
        harness
            .routes
            .create_user(&mut TestHarness::empty_session(), "barish", "1234")
            .await
            .unwrap();
        assert_eq!(harness.routes.get_users(None).await.unwrap().len(), 3);

        harness.reset().await.unwrap();
        let names: Vec<String> = harness
            .routes
            .get_users(None)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_teardown_closes_store() {
        let store: StoreHandle = Arc::new(MemoryStore::new(TEST_DATABASE_NAME));
        let harness = TestHarness::from_store(test_config(), store.clone()).unwrap();

        harness.teardown().await.unwrap();
        assert!(!store.health_check().await);
    }
}
