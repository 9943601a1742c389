use tracing_subscriber::{EnvFilter, fmt};

use crate::system::config::LogConfig;

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("session_api={},tower_http=info", config.level)));

    // A subscriber may already be installed (tests, embedding); that is fine.
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
