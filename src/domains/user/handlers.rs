pub mod session_support;
pub mod user_handlers;

pub use session_support::{commit_session, load_session};
pub use user_handlers::{
    create_user, delete_user, get_session_user, get_user, get_users, log_in, log_out,
    update_user,
};
