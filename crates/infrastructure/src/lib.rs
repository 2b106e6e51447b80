//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_user_service_directory;
mod in_memory_directory;
mod in_memory_relationship_store;
mod permission_graph;
mod postgres_relationship_store;
mod seat_writes;

pub use http_user_service_directory::{DEFAULT_USER_SERVICE_PAGE_SIZE, HttpUserServiceDirectory};
pub use in_memory_directory::InMemoryDirectory;
pub use in_memory_relationship_store::InMemoryRelationshipStore;
pub use permission_graph::{DEFAULT_MAX_DEPTH, PermissionGraph, RelationshipReader};
pub use postgres_relationship_store::{PostgresRelationshipStore, StoreWriteConfig};

/// Embedded migrations for the PostgreSQL relationship store.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
