use anyhow::{Context, Result};
use async_trait::async_trait;
use bson::doc;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, Database, IndexModel,
    error::{ErrorKind, WriteFailure},
    options::{ClientOptions, IndexOptions},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

use super::{Store, StoreError, UserRepository};
use crate::shared::models::User;
use crate::system::config::DatabaseConfig;

const USERS_COLLECTION: &str = "users";
const DUPLICATE_KEY_CODE: i32 = 11000;

pub struct MongoStore {
    client: Client,
    database: Database,
    users: Collection<User>,
    closed: AtomicBool,
}

impl MongoStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let connection_string = Self::connection_string(config);

        let mut client_options = ClientOptions::parse(&connection_string)
            .await
            .with_context(|| format!("Failed to parse connection string for {}", config.database))?;

        // Set connection pool options
        client_options.max_pool_size = Some(config.max_connections);
        client_options.connect_timeout = Some(Duration::from_secs(config.connection_timeout));
        client_options.server_selection_timeout =
            Some(Duration::from_secs(config.connection_timeout));

        let client = Client::with_options(client_options)
            .with_context(|| format!("Failed to create MongoDB client for {}", config.database))?;

        // The database name comes from config, never from the URL path
        let database = client.database(&config.database);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .with_context(|| format!("Failed to ping database {}", config.database))?;

        let store = Self {
            users: database.collection::<User>(USERS_COLLECTION),
            client,
            database,
            closed: AtomicBool::new(false),
        };
        store
            .ensure_indexes()
            .await
            .context("Failed to create user indexes")?;

        info!("✅ Connected to database: {}", config.database);
        Ok(store)
    }

    pub fn connection_string(config: &DatabaseConfig) -> String {
        if let Some(url) = &config.url {
            return url.clone();
        }

        match (&config.username, &config.password) {
            (Some(username), Some(password)) => format!(
                "mongodb://{}:{}@{}:{}/{}",
                username, password, config.host, config.port, config.database
            ),
            _ => format!("mongodb://{}:{}/{}", config.host, config.port, config.database),
        }
    }

    async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(index).await?;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

fn map_write_error(err: mongodb::error::Error, username: &str) -> StoreError {
    if is_duplicate_key(&err) {
        StoreError::Duplicate(format!("username {}", username))
    } else {
        StoreError::Mongo(err)
    }
}

#[async_trait]
impl UserRepository for MongoStore {
    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.users
            .insert_one(user)
            .await
            .map_err(|e| map_write_error(e, &user.username))?;
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.ensure_open()?;
        Ok(self.users.find_one(doc! { "_id": id }).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.ensure_open()?;
        Ok(self.users.find_one(doc! { "username": username }).await?)
    }

    async fn list_users(&self, prefix: Option<&str>) -> Result<Vec<User>, StoreError> {
        self.ensure_open()?;
        let filter = match prefix {
            Some(p) => doc! { "username": { "$regex": format!("^{}", regex::escape(p)) } },
            None => doc! {},
        };

        let cursor = self.users.find(filter).sort(doc! { "username": 1 }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_user(&self, user: &User) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let result = self
            .users
            .replace_one(doc! { "_id": user.id.as_str() }, user)
            .await
            .map_err(|e| map_write_error(e, &user.username))?;
        Ok(result.matched_count > 0)
    }

    async fn delete_user(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let result = self.users.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl Store for MongoStore {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    async fn drop_database(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        self.database.drop().await?;
        // Dropping the database also drops the unique username index
        self.ensure_indexes().await
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            warn!("MongoDB client already closed");
            return Ok(());
        }
        info!("🔒 Closing database connection...");
        self.client.clone().shutdown().await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
            && self.database.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::config::AppConfig;

    #[test]
    fn test_connection_string_without_credentials() {
        let config = AppConfig::default().database;
        assert_eq!(
            MongoStore::connection_string(&config),
            "mongodb://localhost:27017/session-api"
        );
    }

    #[test]
    fn test_connection_string_with_credentials() {
        let mut config = AppConfig::default().database;
        config.username = Some("app".to_string());
        config.password = Some("pw".to_string());
        config.database = "test-db".to_string();

        assert_eq!(
            MongoStore::connection_string(&config),
            "mongodb://app:pw@localhost:27017/test-db"
        );
    }

    #[test]
    fn test_url_takes_precedence() {
        let mut config = AppConfig::default().database;
        config.url = Some("mongodb+srv://cluster.example.net".to_string());
        config.username = Some("ignored".to_string());

        assert_eq!(
            MongoStore::connection_string(&config),
            "mongodb+srv://cluster.example.net"
        );
    }

    // Live MongoDB tests. Run with `cargo test -- --ignored` against a server at
    // DB_URL (default mongodb://localhost:27017).
    const LIVE_DATABASE: &str = "session-api-store-test";

    async fn live_store() -> MongoStore {
        let mut config = AppConfig::default().database;
        config.url = Some(
            std::env::var("DB_URL").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
        );
        config.database = LIVE_DATABASE.to_string();
        let store = MongoStore::connect(&config)
            .await
            .expect("MongoDB reachable at DB_URL");
        store.drop_database().await.unwrap();
        store
    }

    fn user(name: &str) -> User {
        User::new(name.to_string(), format!("hash-{}", name))
    }

    #[tokio::test]
    #[ignore]
    async fn test_duplicate_username_after_drop() {
        let store = live_store().await;
        store.insert_user(&user("alice")).await.unwrap();

        store.drop_database().await.unwrap();
        assert!(store.list_users(None).await.unwrap().is_empty());

        store.insert_user(&user("alice")).await.unwrap();
        assert!(matches!(
            store.insert_user(&user("alice")).await,
            Err(StoreError::Duplicate(_))
        ));

        store.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_prefix_with_regex_metacharacters() {
        let store = live_store().await;
        for name in ["a.b2", "axb", "a.b1", "a+c", "aac"] {
            store.insert_user(&user(name)).await.unwrap();
        }

        let names = |users: Vec<User>| users.into_iter().map(|u| u.username).collect::<Vec<_>>();
        assert_eq!(
            names(store.list_users(Some("a.b")).await.unwrap()),
            vec!["a.b1", "a.b2"]
        );
        assert_eq!(names(store.list_users(Some("a+")).await.unwrap()), vec!["a+c"]);
        assert!(store.list_users(Some("(")).await.unwrap().is_empty());

        store.close().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_health_check_after_close() {
        let store = live_store().await;
        assert!(store.health_check().await);

        store.close().await.unwrap();
        assert!(!store.health_check().await);
        assert!(matches!(
            store.insert_user(&user("alice")).await,
            Err(StoreError::Closed)
        ));
        // A second close is a no-op.
        store.close().await.unwrap();
    }
}
