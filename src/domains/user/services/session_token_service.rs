use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use serde::{Deserialize, Serialize};

use crate::system::config::SessionConfig;

const DEFAULT_ISSUER: &str = "session-api";

#[derive(Debug, thiserror::Error)]
pub enum SessionTokenError {
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
    #[error("Token validation failed: {0}")]
    TokenValidation(String),
    #[error("Token expired")]
    TokenExpired,
    #[error("Missing token")]
    MissingToken,
}

#[derive(Debug, Clone)]
pub struct SessionTokenConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub max_age_hours: i64,
    pub issuer: String,
}

impl SessionTokenConfig {
    /// Uses the configured secret, or a random one that only lives as long as the process.
    pub fn from_session_config(config: &SessionConfig) -> Self {
        let secret = config.secret.clone().unwrap_or_else(generate_secret);
        Self {
            secret,
            algorithm: Algorithm::HS256,
            max_age_hours: config.max_age_hours,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

pub fn generate_secret() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

// Claims carried by the session cookie
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sid: String,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
}

impl SessionClaims {
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() as usize >= self.exp
    }
}

/// Signs and verifies the session id stored in the client cookie.
pub struct SessionTokenService {
    config: SessionTokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl SessionTokenService {
    pub fn new(config: SessionTokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.secret.as_ref());

        let mut validation = Validation::new(config.algorithm);
        validation.set_issuer(&[&config.issuer]);

        Self {
            config,
            encoding_key,
            decoding_key,
            validation,
        }
    }

    pub fn max_age_secs(&self) -> i64 {
        self.config.max_age_hours * 60 * 60
    }

    pub fn issue(&self, session_id: &str) -> Result<(String, DateTime<Utc>), SessionTokenError> {
        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(Duration::hours(self.config.max_age_hours))
            .ok_or_else(|| SessionTokenError::TokenCreation("expiry overflow".to_string()))?;

        let claims = SessionClaims {
            sid: session_id.to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::new(self.config.algorithm), &claims, &self.encoding_key)
            .map_err(|e| SessionTokenError::TokenCreation(e.to_string()))?;

        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionTokenError> {
        if token.is_empty() {
            return Err(SessionTokenError::MissingToken);
        }

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SessionTokenError::TokenExpired,
                _ => SessionTokenError::TokenValidation(e.to_string()),
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service(secret: &str) -> SessionTokenService {
        SessionTokenService::new(SessionTokenConfig {
            secret: secret.to_string(),
            algorithm: Algorithm::HS256,
            max_age_hours: 1,
            issuer: "test-service".to_string(),
        })
    }

    #[test]
    fn test_issue_and_verify() {
        let service = create_test_service("test-secret-key");

        let (token, expires_at) = service.issue("session-1").unwrap();
        assert!(!token.is_empty());
        assert!(expires_at > Utc::now());

        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sid, "session-1");
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_token_from_other_secret_rejected() {
        let issuer = create_test_service("secret-a");
        let verifier = create_test_service("secret-b");

        let (token, _) = issuer.issue("session-1").unwrap();
        assert!(matches!(
            verifier.verify(&token),
            Err(SessionTokenError::TokenValidation(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = create_test_service("test-secret-key");
        let past = Utc::now() - Duration::hours(2);
        let claims = SessionClaims {
            sid: "session-1".to_string(),
            exp: past.timestamp() as usize,
            iat: (past - Duration::hours(1)).timestamp() as usize,
            iss: "test-service".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key"),
        )
        .unwrap();

        assert!(matches!(
            service.verify(&token),
            Err(SessionTokenError::TokenExpired)
        ));
    }

    #[test]
    fn test_empty_and_garbage_tokens() {
        let service = create_test_service("test-secret-key");

        assert!(matches!(service.verify(""), Err(SessionTokenError::MissingToken)));
        assert!(service.verify("not.a.token").is_err());
    }

    #[test]
    fn test_generated_secret() {
        let a = generate_secret();
        assert_eq!(a.len(), 48);
        assert_ne!(a, generate_secret());

        let config = SessionConfig {
            cookie_name: "sid".to_string(),
            secret: None,
            max_age_hours: 24,
        };
        let token_config = SessionTokenConfig::from_session_config(&config);
        assert_eq!(token_config.secret.len(), 48);
        assert_eq!(token_config.max_age_hours, 24);
    }
}
