use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::domains::user::services::PasswordConfig;

/// Database name every test run must be connected to.
pub const TEST_DATABASE_NAME: &str = "test-db";
pub const DEFAULT_DATABASE_NAME: &str = "session-api";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    MongoDb,
    Memory,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mongodb" | "mongo" => Some(StoreBackend::MongoDb),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Full connection string; takes precedence over host/port/credentials.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connection_timeout: u64,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Signing secret for the session cookie. A random one is generated when unset.
    pub secret: Option<String>,
    pub max_age_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub log: LogConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub password: PasswordConfig,
    pub environment: String,
    pub test_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            log: LogConfig {
                level: "info".to_string(),
            },
            database: DatabaseConfig {
                backend: StoreBackend::MongoDb,
                url: None,
                host: "localhost".to_string(),
                port: 27017,
                database: DEFAULT_DATABASE_NAME.to_string(),
                username: None,
                password: None,
                connection_timeout: 10,
                max_connections: 10,
            },
            session: SessionConfig {
                cookie_name: "sid".to_string(),
                secret: None,
                max_age_hours: 24,
            },
            password: PasswordConfig::default(),
            environment: "development".to_string(),
            test_mode: false,
        }
    }
}

impl AppConfig {
    /// Loads env files, then builds the config from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        // `.env` may itself carry APP_ENV or TEST, so it goes first
        load_optional_env_file(Path::new(".env"))?;

        let lookup = |key: &str| env::var(key).ok();
        let environment = resolve_environment(&lookup);
        load_env_files(Path::new("configs"), &environment)?;

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        config.test_mode = is_test_flag(&lookup);
        config.environment = resolve_environment(&lookup);

        // Server config
        if let Some(host) = lookup("SERVER_HOST") {
            config.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            config.server.port = parse_value("SERVER_PORT", &port)?;
        }

        // Log config
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log.level = level;
        }

        // Database config
        if let Some(backend) = lookup("DB_BACKEND") {
            config.database.backend =
                StoreBackend::parse(&backend).ok_or_else(|| ConfigError::InvalidValue {
                    key: "DB_BACKEND".to_string(),
                    value: backend.clone(),
                })?;
        }
        if let Some(url) = lookup("DB_URL") {
            config.database.url = Some(url);
        }
        if let Some(host) = lookup("DB_HOST") {
            config.database.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            config.database.port = parse_value("DB_PORT", &port)?;
        }
        if let Some(database) = lookup("DB_DATABASE") {
            config.database.database = database;
        }
        config.database.username = lookup("DB_USERNAME");
        config.database.password = lookup("DB_PASSWORD");
        if let Some(timeout) = lookup("DB_CONNECTION_TIMEOUT") {
            config.database.connection_timeout = parse_value("DB_CONNECTION_TIMEOUT", &timeout)?;
        }
        if let Some(max) = lookup("DB_MAX_CONNECTIONS") {
            config.database.max_connections = parse_value("DB_MAX_CONNECTIONS", &max)?;
        }

        // Session config
        if let Some(secret) = lookup("SESSION_SECRET") {
            config.session.secret = Some(secret);
        }
        if let Some(hours) = lookup("SESSION_MAX_AGE_HOURS") {
            config.session.max_age_hours = parse_value("SESSION_MAX_AGE_HOURS", &hours)?;
        }

        // Password policy
        if let Some(min_length) = lookup("PASSWORD_MIN_LENGTH") {
            config.password.min_length = parse_value("PASSWORD_MIN_LENGTH", &min_length)?;
        }
        if let Some(cost) = lookup("BCRYPT_COST") {
            config.password.bcrypt_cost = parse_value("BCRYPT_COST", &cost)?;
        }
        if let Some(flag) = lookup("PASSWORD_REQUIRE_UPPERCASE") {
            config.password.require_uppercase = parse_flag("PASSWORD_REQUIRE_UPPERCASE", &flag)?;
        }
        if let Some(flag) = lookup("PASSWORD_REQUIRE_LOWERCASE") {
            config.password.require_lowercase = parse_flag("PASSWORD_REQUIRE_LOWERCASE", &flag)?;
        }
        if let Some(flag) = lookup("PASSWORD_REQUIRE_NUMBERS") {
            config.password.require_numbers = parse_flag("PASSWORD_REQUIRE_NUMBERS", &flag)?;
        }
        if let Some(flag) = lookup("PASSWORD_REQUIRE_SPECIAL_CHARS") {
            config.password.require_special_chars =
                parse_flag("PASSWORD_REQUIRE_SPECIAL_CHARS", &flag)?;
        }

        if config.test_mode {
            config.database.database = TEST_DATABASE_NAME.to_string();
        }

        Ok(config)
    }
}

fn is_test_flag<F: Fn(&str) -> Option<String>>(lookup: &F) -> bool {
    lookup("TEST")
        .map(|value| matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn resolve_environment<F: Fn(&str) -> Option<String>>(lookup: &F) -> String {
    if is_test_flag(lookup) {
        return "test".to_string();
    }
    lookup("APP_ENV").unwrap_or_else(|| "development".to_string())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Loads `.env.local`, `.env.{environment}` and `.env.default` from `dir`.
/// Variables already set win over later files, so the order is highest priority first.
pub fn load_env_files(dir: &Path, environment: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let candidates = [
        dir.join(".env.local"),
        dir.join(format!(".env.{}", environment)),
        dir.join(".env.default"),
    ];

    let mut loaded = Vec::new();
    for path in candidates {
        if load_optional_env_file(&path)? {
            loaded.push(path);
        }
    }

    Ok(loaded)
}

fn load_optional_env_file(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(dotenvy::Error::Io(_)) => Ok(false),
        Err(e) => Err(ConfigError::EnvFile(e)),
    }
}
