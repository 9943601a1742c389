pub mod password_service;
pub mod session_service;
pub mod session_token_service;
pub mod user_service;

pub use password_service::{PasswordConfig, PasswordError, PasswordService};
pub use session_service::SessionService;
pub use session_token_service::{
    SessionClaims, SessionTokenConfig, SessionTokenError, SessionTokenService,
};
pub use user_service::UserService;
