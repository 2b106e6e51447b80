use std::sync::Arc;

use seatkeeper_application::{
    AccessService, LicenseService, PrincipalRepository, RelationshipStore, SubjectRepository,
};
use seatkeeper_core::{AppError, AppResult};
use seatkeeper_domain::{LicenseKey, PermissionSchema, Relationship};
use seatkeeper_infrastructure::{
    HttpUserServiceDirectory, InMemoryDirectory, InMemoryRelationshipStore,
    PostgresRelationshipStore,
};
use tracing::info;

use crate::api_config::{ApiConfig, StoreBackendConfig};
use crate::state::AppState;

use super::connect_and_migrate;

/// Concrete relationship store selected by configuration.
///
/// Keeps the adapter type for provisioning, which is not on the
/// [`RelationshipStore`] port.
#[derive(Clone)]
pub enum StoreHandle {
    Memory(Arc<InMemoryRelationshipStore>),
    Postgres(Arc<PostgresRelationshipStore>),
}

impl StoreHandle {
    pub fn as_store(&self) -> Arc<dyn RelationshipStore> {
        match self {
            Self::Memory(store) => store.clone(),
            Self::Postgres(store) => store.clone(),
        }
    }

    pub async fn provision_license(&self, key: &LicenseKey, max_seats: u32) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.provision_license(key, max_seats).await,
            Self::Postgres(store) => store.provision_license(key, max_seats).await,
        }
    }

    pub async fn write_relationship(&self, relationship: Relationship) -> AppResult<()> {
        match self {
            Self::Memory(store) => store.write_relationship(relationship).await,
            Self::Postgres(store) => store.write_relationship(relationship).await,
        }
    }
}

pub fn load_permission_schema(config: &ApiConfig) -> Result<Arc<PermissionSchema>, AppError> {
    let Some(path) = config.permission_schema_path.as_ref() else {
        return Ok(Arc::new(PermissionSchema::builtin()));
    };

    let contents = std::fs::read_to_string(path).map_err(|error| {
        AppError::Internal(format!(
            "failed to read permission schema '{}': {error}",
            path.display()
        ))
    })?;
    let schema = PermissionSchema::from_json(contents.as_str())?;
    info!(path = %path.display(), namespaces = schema.namespaces.len(), "loaded permission schema");

    Ok(Arc::new(schema))
}

pub async fn build_store(
    config: &ApiConfig,
    schema: Arc<PermissionSchema>,
) -> Result<StoreHandle, AppError> {
    match &config.store_backend {
        StoreBackendConfig::Memory => {
            info!("using in-memory relationship store");
            Ok(StoreHandle::Memory(Arc::new(InMemoryRelationshipStore::new(
                schema,
            ))))
        }
        StoreBackendConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pool = connect_and_migrate(database_url, *max_connections).await?;
            info!(
                max_attempts = config.store_write.max_attempts,
                retry_backoff_ms = config.store_write.retry_backoff_ms,
                "using postgres relationship store"
            );
            Ok(StoreHandle::Postgres(Arc::new(
                PostgresRelationshipStore::with_write_config(pool, schema, config.store_write),
            )))
        }
    }
}

pub fn build_app_state(
    store: &StoreHandle,
    directory: Arc<InMemoryDirectory>,
    config: &ApiConfig,
) -> Result<AppState, AppError> {
    let subjects: Arc<dyn SubjectRepository> = match &config.user_service {
        Some(user_service) => {
            let http_client = reqwest::Client::builder()
                .timeout(user_service.timeout)
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build user service client: {error}"))
                })?;
            info!(url = %user_service.url, page_size = user_service.page_size, "using user service directory");

            Arc::new(
                HttpUserServiceDirectory::new(http_client, user_service.url.clone())
                    .with_page_size(user_service.page_size),
            )
        }
        None => directory.clone(),
    };
    let principals: Arc<dyn PrincipalRepository> = directory;

    let access_service = AccessService::new(store.as_store());
    let license_service = LicenseService::new(
        access_service.clone(),
        store.as_store(),
        principals,
        subjects,
    );

    Ok(AppState {
        access_service,
        license_service,
    })
}
