use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use seatkeeper_application::RelationshipStore;
use seatkeeper_core::AppError;
use seatkeeper_domain::{
    AccessDecision, LicenseKey, PermissionSchema, Relation, Relationship, RelationshipSubject,
    Resource, Service, SubjectId,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{PostgresRelationshipStore, StoreWriteConfig};
use crate::MIGRATOR;

static ORG_SEQUENCE: AtomicU64 = AtomicU64::new(0);

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres relationship store tests: {error}");
    }

    Some(pool)
}

fn unique_key(service_id: &str) -> LicenseKey {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let sequence = ORG_SEQUENCE.fetch_add(1, Ordering::Relaxed);

    LicenseKey::new(format!("org-{nanos}-{sequence}"), service_id)
        .unwrap_or_else(|_| unreachable!())
}

fn ids(values: &[&str]) -> Vec<SubjectId> {
    values.iter().map(|value| SubjectId::from(*value)).collect()
}

async fn seeded_store(pool: PgPool) -> (PostgresRelationshipStore, LicenseKey) {
    let store = PostgresRelationshipStore::with_write_config(
        pool,
        Arc::new(PermissionSchema::builtin()),
        StoreWriteConfig {
            max_attempts: 20,
            retry_backoff_ms: 5,
        },
    );
    let key = unique_key("smarts");

    assert!(store.provision_license(&key, 10).await.is_ok());
    assert!(
        store
            .assign_seats(&ids(&["u1"]), &key, &Service::new("smarts"))
            .await
            .is_ok()
    );

    (store, key)
}

async fn in_use(store: &PostgresRelationshipStore, key: &LicenseKey) -> u32 {
    store
        .get_license(key)
        .await
        .map(|license| license.in_use)
        .unwrap_or(u32::MAX)
}

#[tokio::test]
async fn seeded_license_answers_checks_and_counts() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let (store, key) = seeded_store(pool).await;
    let license = Resource::license(&key);

    let allowed = store
        .check_access(&SubjectId::from("u1"), "access", &license)
        .await;
    assert!(matches!(allowed, Ok(AccessDecision::Allowed)));

    let stranger = store
        .check_access(&SubjectId::from("doesnotexist"), "access", &license)
        .await;
    assert!(matches!(stranger, Ok(AccessDecision::Denied)));

    let counts = store.get_license(&key).await;
    assert!(matches!(&counts, Ok(value) if value.max_seats == 10 && value.in_use == 1));
    assert_eq!(
        store.get_assigned(&key).await.unwrap_or_default(),
        ids(&["u1"])
    );
}

#[tokio::test]
async fn batch_preconditions_leave_state_unchanged() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let (store, key) = seeded_store(pool).await;
    let service = Service::new("smarts");

    let mixed = store.assign_seats(&ids(&["new", "u1"]), &key, &service).await;
    assert!(matches!(mixed, Err(AppError::AlreadyAssigned(_))));

    let free = store
        .unassign_seats(&ids(&["not_assigned"]), &key, &service)
        .await;
    assert!(matches!(free, Err(AppError::NotAssigned(_))));

    let oversized: Vec<String> = (0..10).map(|index| format!("b{index}")).collect();
    let oversized: Vec<&str> = oversized.iter().map(String::as_str).collect();
    let too_many = store.assign_seats(&ids(&oversized), &key, &service).await;
    assert!(matches!(too_many, Err(AppError::CapacityExceeded(_))));

    assert_eq!(in_use(&store, &key).await, 1);
}

#[tokio::test]
async fn assign_and_unassign_adjust_in_use() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let (store, key) = seeded_store(pool).await;
    let service = Service::new("smarts");

    assert!(
        store
            .assign_seats(&ids(&["u100", "u101"]), &key, &service)
            .await
            .is_ok()
    );
    assert_eq!(in_use(&store, &key).await, 3);

    assert!(store.unassign_seats(&ids(&["u1"]), &key, &service).await.is_ok());
    assert_eq!(in_use(&store, &key).await, 2);
}

#[tokio::test]
async fn concurrent_assigns_never_overbook() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let (store, key) = seeded_store(pool).await;
    let store = Arc::new(store);
    let mut handles = Vec::new();

    for index in 0..20 {
        let store = store.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            store
                .assign_seats(
                    &[SubjectId::from(format!("c{index}"))],
                    &key,
                    &Service::new("smarts"),
                )
                .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => succeeded += 1,
            Ok(Err(AppError::CapacityExceeded(_) | AppError::StoreUnavailable(_))) => {}
            Ok(Err(error)) => panic!("unexpected seat write error: {error}"),
            Err(error) => panic!("seat write task failed: {error}"),
        }
    }

    assert!(succeeded <= 9);
    assert_eq!(in_use(&store, &key).await, 1 + succeeded);
}

#[tokio::test]
async fn org_admin_administers_license_through_arrow() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let (store, key) = seeded_store(pool).await;

    let written = store
        .write_relationship(Relationship::new(
            Resource::org(key.org_id()),
            Relation::Admin,
            RelationshipSubject::principal("boss"),
        ))
        .await;
    assert!(written.is_ok());

    let decision = store
        .check_access(
            &SubjectId::from("boss"),
            "view-license",
            &Resource::license(&key),
        )
        .await;
    assert!(matches!(decision, Ok(AccessDecision::Allowed)));
}

#[tokio::test]
async fn unknown_license_has_no_capacity() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PostgresRelationshipStore::new(pool, Arc::new(PermissionSchema::builtin()));
    let key = unique_key("ghost");

    let license = store.get_license(&key).await;
    assert!(matches!(&license, Ok(value) if value.max_seats == 0 && value.in_use == 0));

    let result = store
        .assign_seats(&ids(&["u1"]), &key, &Service::new("ghost"))
        .await;
    assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
}

#[tokio::test]
async fn provisioning_below_seats_in_use_is_rejected() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let (store, key) = seeded_store(pool).await;

    let lowered = store.provision_license(&key, 0).await;
    assert!(matches!(lowered, Err(AppError::Validation(_))));

    let license = store.get_license(&key).await;
    assert!(matches!(&license, Ok(value) if value.max_seats == 10 && value.in_use == 1));

    assert!(store.provision_license(&key, 1).await.is_ok());
    let license = store.get_license(&key).await;
    assert!(matches!(&license, Ok(value) if value.max_seats == 1 && value.in_use == 1));

    let full = store
        .assign_seats(&ids(&["u2"]), &key, &Service::new("smarts"))
        .await;
    assert!(matches!(full, Err(AppError::CapacityExceeded(_))));
}
