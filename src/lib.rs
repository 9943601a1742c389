pub mod app;
pub mod domains;
pub mod shared;
pub mod system;

pub use app::build_router;
pub use domains::user::routes::Routes;
pub use shared::error::{AppError, AppResult};
pub use shared::models::{User, UserDto, WebSession};
pub use system::bootstrap::TestHarness;
