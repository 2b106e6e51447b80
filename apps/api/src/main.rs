//! Seatkeeper API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use seatkeeper_core::AppError;
use seatkeeper_infrastructure::InMemoryDirectory;
use tracing::info;

use crate::api_config::{ApiConfig, StoreBackendConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    if config.migrate_only {
        if let StoreBackendConfig::Postgres {
            database_url,
            max_connections,
        } = &config.store_backend
        {
            api_services::connect_and_migrate(database_url, *max_connections).await?;
        }
        info!("database migrations applied successfully");
        return Ok(());
    }

    let schema = api_services::load_permission_schema(&config)?;
    let store = api_services::build_store(&config, schema).await?;
    let directory = Arc::new(InMemoryDirectory::new());

    if config.dev_seed {
        dev_seed::run(&store, &directory).await?;
    }

    let app_state = api_services::build_app_state(&store, directory, &config)?;
    let app = api_router::build_router(app_state, config.request_timeout);

    let address = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "seatkeeper-api listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
