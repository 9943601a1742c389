use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::domains::user::services::{PasswordError, SessionTokenError};
use crate::system::database::StoreError;

pub type AppResult<T> = Result<T, AppError>;

/// Failure of a route or concept action. Every variant maps to one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadValues(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    NotAllowed(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Password processing failed: {0}")]
    Password(String),
    #[error("Session token rejected: {0}")]
    Token(#[from] SessionTokenError),
    #[error("Storage failure: {0}")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadValues(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) | AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::NotAllowed(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Password(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::BadValues(_) => "bad_values",
            AppError::Unauthenticated(_) => "unauthenticated",
            AppError::NotAllowed(_) => "not_allowed",
            AppError::NotFound(_) => "not_found",
            AppError::AlreadyExists(_) => "already_exists",
            AppError::Conflict(_) => "session_conflict",
            AppError::Password(_) => "password_error",
            AppError::Token(_) => "invalid_session",
            AppError::Store(_) => "store_error",
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::WeakPassword { .. } | PasswordError::ValidationFailed(_) => {
                AppError::BadValues(e.to_string())
            }
            PasswordError::HashingFailed(_) | PasswordError::VerificationFailed(_) => {
                AppError::Password(e.to_string())
            }
        }
    }
}

// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse::new(self.kind(), &self.to_string());
        (status, Json(body)).into_response()
    }
}
