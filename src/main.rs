use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use session_api::{
    app::{API_VERSION, build_router},
    domains::user::state::UserState,
    shared::state::SharedState,
    system::{bootstrap, config::AppConfig, database, logging},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    logging::init(&config.log);

    info!("✅ Configuration loaded successfully");
    info!("🌍 Environment: {}", config.environment);
    info!("📊 Log Level: {}", config.log.level);

    let store = database::open_store(&config.database)
        .await
        .context("Failed to initialize database")?;

    if config.test_mode {
        bootstrap::ensure_test_database(store.as_ref())?;
        info!("🧪 Test mode: connected to {}", store.database_name());
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let shared_state = Arc::new(SharedState::new(config, store.clone()));
    let user_state = Arc::new(UserState::new(shared_state));
    let app = build_router(user_state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🚀 Server running on http://{}", addr);
    info!("🏷️  Current API version: {}", API_VERSION);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.close().await?;
    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
