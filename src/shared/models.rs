pub mod user;
pub mod web_session;

pub use user::{User, UserDto};
pub use web_session::{SessionCookie, WebSession};
