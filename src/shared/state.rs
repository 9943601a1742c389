use std::sync::Arc;

use crate::system::config::AppConfig;
use crate::system::database::StoreHandle;

/// Global shared state containing system-level dependencies
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<AppConfig>,
    pub store: StoreHandle,
}

impl SharedState {
    pub fn new(config: AppConfig, store: StoreHandle) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}
