use bcrypt::{hash, verify};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static UPPERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]").expect("static pattern"));
static LOWERCASE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z]").expect("static pattern"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]").expect("static pattern"));
static SPECIAL_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!@#$%^&*(),.?:{}|<>]").expect("static pattern"));

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),
    #[error("Password verification failed: {0}")]
    VerificationFailed(String),
    #[error("Password validation failed: {0}")]
    ValidationFailed(String),
    #[error("Password too weak: {violations:?}")]
    WeakPassword { violations: Vec<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordConfig {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_numbers: bool,
    pub require_special_chars: bool,
    pub bcrypt_cost: u32,
}

impl Default for PasswordConfig {
    // Only non-empty passwords are required unless configured otherwise
    fn default() -> Self {
        Self {
            min_length: 1,
            require_uppercase: false,
            require_lowercase: false,
            require_numbers: false,
            require_special_chars: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

pub struct PasswordService {
    config: PasswordConfig,
}

impl PasswordService {
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    // Hash a password using bcrypt
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.validate_password_strength(password)?;

        hash(password, self.config.bcrypt_cost)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    // Verify a password against its hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        verify(password, hash).map_err(|e| PasswordError::VerificationFailed(e.to_string()))
    }

    // Validate password strength according to configured rules
    pub fn validate_password_strength(&self, password: &str) -> Result<(), PasswordError> {
        if password.is_empty() {
            return Err(PasswordError::ValidationFailed(
                "Password must be non-empty".to_string(),
            ));
        }

        let mut violations = Vec::new();

        if password.chars().count() < self.config.min_length {
            violations.push(format!(
                "Password must be at least {} chars",
                self.config.min_length
            ));
        }
        if self.config.require_uppercase && !UPPERCASE.is_match(password) {
            violations.push("Password must contain uppercase letters".to_string());
        }
        if self.config.require_lowercase && !LOWERCASE.is_match(password) {
            violations.push("Password must contain lowercase letters".to_string());
        }
        if self.config.require_numbers && !NUMBER.is_match(password) {
            violations.push("Password must contain numbers".to_string());
        }
        if self.config.require_special_chars && !SPECIAL_CHAR.is_match(password) {
            violations.push("Password must contain special characters".to_string());
        }

        if !violations.is_empty() {
            return Err(PasswordError::WeakPassword { violations });
        }

        Ok(())
    }
}
