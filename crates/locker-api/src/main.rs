mod auth;
mod config;
mod error;
mod routes;

use std::sync::Arc;

use config::AppConfig;
use locker_core::db::{Database, Schema};
use locker_core::{DatabaseConflictStore, ItemService};
use routes::{app_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only load .env in development; production uses platform-native env injection.
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locker_api=info".parse()?)
                .add_directive("locker_core=info".parse()?),
        )
        .init();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!("Starting locker-api with config: {:?}", config);

    let items = ItemService::new(
        Database::open(&config.items_db_path, Schema::Items).await?,
    )?;
    let conflicts = DatabaseConflictStore::new(
        Database::open(&config.conflicts_db_path, Schema::Conflicts).await?,
    )?;
    if config.items_service_url.is_some() {
        tracing::info!("Sync reaches the item service over HTTP");
    }

    let state = AppState::new(config, items, conflicts)?;
    let bind_addr = state.config.bind_addr.clone();
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("locker-api listening on {}", bind_addr);
    axum::serve(listener, router).await?;
    Ok(())
}
