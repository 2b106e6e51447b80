use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use seatkeeper_application::{RelationshipStore, normalize_seat_batch};
use seatkeeper_core::{AppError, AppResult};
use seatkeeper_domain::{
    AccessDecision, License, LicenseKey, PermissionSchema, Relation, Relationship,
    RelationshipSubject, Resource, ResourceType, Service, SubjectId,
};

use crate::permission_graph::{PermissionGraph, RelationshipReader};
use crate::seat_writes::{
    already_assigned, capacity_exceeded, ensure_service_matches, exceeds_capacity, not_assigned,
};

const PRINCIPAL_SUBJECT_TYPE: &str = "subject";

/// Retry policy for optimistic seat writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreWriteConfig {
    /// Attempts before a contended write surfaces `StoreUnavailable`.
    pub max_attempts: u8,
    /// Base backoff, multiplied by the attempt number.
    pub retry_backoff_ms: u64,
}

impl Default for StoreWriteConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_backoff_ms: 25,
        }
    }
}

/// PostgreSQL-backed relationship store.
///
/// Seat writes are optimistic: each attempt reads the license version with
/// the seat snapshot and commits only if the version is unchanged.
#[derive(Clone)]
pub struct PostgresRelationshipStore {
    pool: PgPool,
    graph: PermissionGraph,
    write_config: StoreWriteConfig,
}

impl PostgresRelationshipStore {
    /// Creates a store over the pool with the default retry policy.
    #[must_use]
    pub fn new(pool: PgPool, schema: Arc<PermissionSchema>) -> Self {
        Self::with_write_config(pool, schema, StoreWriteConfig::default())
    }

    /// Creates a store with an explicit retry policy.
    #[must_use]
    pub fn with_write_config(
        pool: PgPool,
        schema: Arc<PermissionSchema>,
        write_config: StoreWriteConfig,
    ) -> Self {
        Self {
            pool,
            graph: PermissionGraph::new(schema),
            write_config: StoreWriteConfig {
                max_attempts: write_config.max_attempts.max(1),
                retry_backoff_ms: write_config.retry_backoff_ms,
            },
        }
    }

    /// Sets the seat limit of a license and links it to its organization.
    ///
    /// A limit below the seats already in use is rejected.
    pub async fn provision_license(&self, key: &LicenseKey, max_seats: u32) -> AppResult<()> {
        let limit = i32::try_from(max_seats).map_err(|_| {
            AppError::Validation(format!("seat limit {max_seats} is out of range"))
        })?;
        let mut transaction = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO licenses (org_id, service_id, max_seats, version)
            VALUES ($1, $2, 0, 0)
            ON CONFLICT (org_id, service_id) DO NOTHING
            "#,
        )
        .bind(key.org_id())
        .bind(key.service_id())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to provision license '{key}': {error}"))
        })?;

        sqlx::query(
            r#"
            SELECT version
            FROM licenses
            WHERE org_id = $1 AND service_id = $2
            FOR UPDATE
            "#,
        )
        .bind(key.org_id())
        .bind(key.service_id())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to lock license '{key}': {error}"))
        })?;

        let in_use = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM relationships
            WHERE resource_type = 'license'
                AND resource_id = $1
                AND relation = 'assigned'
                AND subject_type = 'subject'
            "#,
        )
        .bind(key.resource_id())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!(
                "failed to count seats of license '{key}': {error}"
            ))
        })?;

        if in_use > i64::from(limit) {
            rollback(transaction).await?;
            return Err(AppError::Validation(format!(
                "license '{key}' already has {in_use} seats in use, above {max_seats}"
            )));
        }

        sqlx::query(
            r#"
            UPDATE licenses
            SET max_seats = $3, version = version + 1
            WHERE org_id = $1 AND service_id = $2
            "#,
        )
        .bind(key.org_id())
        .bind(key.service_id())
        .bind(limit)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!("failed to provision license '{key}': {error}"))
        })?;

        insert_relationship(
            &mut transaction,
            &Relationship::new(
                Resource::license(key),
                Relation::Org,
                RelationshipSubject::object(Resource::org(key.org_id())),
            ),
        )
        .await?;

        commit(transaction).await
    }

    /// Writes one edge, bumping the license version when it targets a license.
    pub async fn write_relationship(&self, relationship: Relationship) -> AppResult<()> {
        let license_key = if relationship.resource.is_type(ResourceType::License) {
            Some(LicenseKey::from_resource_id(
                relationship.resource.id.as_str(),
            )?)
        } else {
            None
        };
        let mut transaction = self.begin().await?;

        if let Some(key) = license_key {
            sqlx::query(
                r#"
                UPDATE licenses
                SET version = version + 1
                WHERE org_id = $1 AND service_id = $2
                "#,
            )
            .bind(key.org_id())
            .bind(key.service_id())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::StoreUnavailable(format!(
                    "failed to bump version of license '{key}': {error}"
                ))
            })?;
        }

        insert_relationship(&mut transaction, &relationship).await?;
        commit(transaction).await
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(|error| {
            AppError::StoreUnavailable(format!("failed to begin transaction: {error}"))
        })
    }

    async fn read_snapshot(
        &self,
        key: &LicenseKey,
        batch: &[String],
    ) -> AppResult<SeatSnapshot> {
        let row = sqlx::query_as::<_, SeatSnapshotRow>(
            r#"
            SELECT
                licenses.max_seats,
                licenses.version,
                (
                    SELECT COUNT(*)
                    FROM relationships
                    WHERE resource_type = 'license'
                        AND resource_id = $3
                        AND relation = 'assigned'
                        AND subject_type = 'subject'
                ) AS in_use,
                ARRAY(
                    SELECT subject_id
                    FROM relationships
                    WHERE resource_type = 'license'
                        AND resource_id = $3
                        AND relation = 'assigned'
                        AND subject_type = 'subject'
                        AND subject_id = ANY($4)
                ) AS held
            FROM (SELECT 1) AS anchor
            LEFT JOIN licenses
                ON licenses.org_id = $1 AND licenses.service_id = $2
            "#,
        )
        .bind(key.org_id())
        .bind(key.service_id())
        .bind(key.resource_id())
        .bind(batch)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!(
                "failed to read seat snapshot of license '{key}': {error}"
            ))
        })?;

        SeatSnapshot::try_from_row(key, row)
    }

    async fn run_seat_write(
        &self,
        key: &LicenseKey,
        batch: &[SubjectId],
        kind: SeatWrite,
    ) -> AppResult<()> {
        let values: Vec<String> = batch.iter().map(|id| id.as_str().to_owned()).collect();
        let mut attempt = 0_u8;

        while attempt < self.write_config.max_attempts {
            attempt = attempt.saturating_add(1);

            let snapshot = self.read_snapshot(key, &values).await?;
            kind.check_preconditions(key, batch, &snapshot)?;

            match self.try_commit(key, &values, &snapshot, kind).await? {
                WriteOutcome::Committed => return Ok(()),
                WriteOutcome::Conflict => {
                    tracing::debug!(
                        license = %key,
                        attempt,
                        "seat write lost an optimistic race"
                    );
                }
            }

            if attempt < self.write_config.max_attempts {
                let delay = self
                    .write_config
                    .retry_backoff_ms
                    .saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        tracing::warn!(
            license = %key,
            attempts = self.write_config.max_attempts,
            "seat write stayed contended"
        );
        Err(AppError::StoreUnavailable(format!(
            "seat write on license '{key}' stayed contended after {} attempts",
            self.write_config.max_attempts
        )))
    }

    async fn try_commit(
        &self,
        key: &LicenseKey,
        values: &[String],
        snapshot: &SeatSnapshot,
        kind: SeatWrite,
    ) -> AppResult<WriteOutcome> {
        let mut transaction = self.begin().await?;

        if !bump_version(&mut transaction, key, snapshot.version).await? {
            rollback(transaction).await?;
            return Ok(WriteOutcome::Conflict);
        }

        let written = match kind {
            SeatWrite::Assign => {
                let result = sqlx::query(
                    r#"
                    INSERT INTO relationships
                        (resource_type, resource_id, relation, subject_type, subject_id)
                    SELECT 'license', $1, 'assigned', 'subject', subject_id
                    FROM UNNEST($2::TEXT[]) AS batch(subject_id)
                    "#,
                )
                .bind(key.resource_id())
                .bind(values)
                .execute(&mut *transaction)
                .await;

                match result {
                    Ok(done) => done.rows_affected(),
                    Err(error) if is_unique_violation(&error) => {
                        rollback(transaction).await?;
                        return Ok(WriteOutcome::Conflict);
                    }
                    Err(error) => {
                        return Err(AppError::StoreUnavailable(format!(
                            "failed to write seats on license '{key}': {error}"
                        )));
                    }
                }
            }
            SeatWrite::Unassign => sqlx::query(
                r#"
                DELETE FROM relationships
                WHERE resource_type = 'license'
                    AND resource_id = $1
                    AND relation = 'assigned'
                    AND subject_type = 'subject'
                    AND subject_id = ANY($2)
                "#,
            )
            .bind(key.resource_id())
            .bind(values)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::StoreUnavailable(format!(
                    "failed to remove seats on license '{key}': {error}"
                ))
            })?
            .rows_affected(),
        };

        if written != values.len() as u64 {
            rollback(transaction).await?;
            return Ok(WriteOutcome::Conflict);
        }

        commit(transaction).await?;
        Ok(WriteOutcome::Committed)
    }
}

#[derive(Debug, FromRow)]
struct SeatSnapshotRow {
    max_seats: Option<i32>,
    version: Option<i64>,
    in_use: i64,
    held: Vec<String>,
}

#[derive(Debug)]
struct SeatSnapshot {
    max_seats: u32,
    version: Option<i64>,
    in_use: u32,
    held: Vec<SubjectId>,
}

impl SeatSnapshot {
    fn try_from_row(key: &LicenseKey, row: SeatSnapshotRow) -> AppResult<Self> {
        let max_seats = u32::try_from(row.max_seats.unwrap_or(0)).map_err(|error| {
            AppError::Internal(format!("license '{key}' has a negative seat limit: {error}"))
        })?;
        let in_use = u32::try_from(row.in_use).map_err(|error| {
            AppError::Internal(format!("license '{key}' seat count is out of range: {error}"))
        })?;

        Ok(Self {
            max_seats,
            version: row.version,
            in_use,
            held: row.held.into_iter().map(SubjectId::from).collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeatWrite {
    Assign,
    Unassign,
}

impl SeatWrite {
    fn check_preconditions(
        self,
        key: &LicenseKey,
        batch: &[SubjectId],
        snapshot: &SeatSnapshot,
    ) -> AppResult<()> {
        match self {
            Self::Assign => {
                if !snapshot.held.is_empty() {
                    return Err(already_assigned(key, &snapshot.held));
                }

                if exceeds_capacity(batch.len(), snapshot.in_use, snapshot.max_seats) {
                    return Err(capacity_exceeded(
                        key,
                        batch.len(),
                        snapshot.in_use,
                        snapshot.max_seats,
                    ));
                }
            }
            Self::Unassign => {
                let missing: Vec<SubjectId> = batch
                    .iter()
                    .filter(|subject| !snapshot.held.contains(subject))
                    .cloned()
                    .collect();

                if !missing.is_empty() {
                    return Err(not_assigned(key, &missing));
                }
            }
        }

        Ok(())
    }
}

enum WriteOutcome {
    Committed,
    Conflict,
}

async fn bump_version(
    transaction: &mut Transaction<'_, Postgres>,
    key: &LicenseKey,
    read_version: Option<i64>,
) -> AppResult<bool> {
    let result = match read_version {
        Some(version) => {
            sqlx::query(
                r#"
                UPDATE licenses
                SET version = version + 1
                WHERE org_id = $1 AND service_id = $2 AND version = $3
                "#,
            )
            .bind(key.org_id())
            .bind(key.service_id())
            .bind(version)
            .execute(&mut **transaction)
            .await
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO licenses (org_id, service_id, max_seats, version)
                VALUES ($1, $2, 0, 1)
                ON CONFLICT (org_id, service_id) DO NOTHING
                "#,
            )
            .bind(key.org_id())
            .bind(key.service_id())
            .execute(&mut **transaction)
            .await
        }
    };

    result
        .map(|done| done.rows_affected() == 1)
        .map_err(|error| {
            AppError::StoreUnavailable(format!(
                "failed to bump version of license '{key}': {error}"
            ))
        })
}

async fn insert_relationship(
    transaction: &mut Transaction<'_, Postgres>,
    relationship: &Relationship,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO relationships
            (resource_type, resource_id, relation, subject_type, subject_id)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(relationship.resource.resource_type.as_str())
    .bind(relationship.resource.id.as_str())
    .bind(relationship.relation.as_str())
    .bind(relationship.subject.storage_type())
    .bind(relationship.subject.storage_id())
    .execute(&mut **transaction)
    .await
    .map_err(|error| {
        AppError::StoreUnavailable(format!(
            "failed to write relationship on '{}': {error}",
            relationship.resource
        ))
    })?;

    Ok(())
}

async fn commit(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction.commit().await.map_err(|error| {
        AppError::StoreUnavailable(format!("failed to commit transaction: {error}"))
    })
}

async fn rollback(transaction: Transaction<'_, Postgres>) -> AppResult<()> {
    transaction.rollback().await.map_err(|error| {
        AppError::StoreUnavailable(format!("failed to roll back transaction: {error}"))
    })
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|database_error| database_error.is_unique_violation())
}

#[derive(Debug, FromRow)]
struct ObjectSubjectRow {
    subject_type: String,
    subject_id: String,
}

#[async_trait]
impl RelationshipReader for PostgresRelationshipStore {
    async fn has_relationship(
        &self,
        resource: &Resource,
        relation: &str,
        subject: &SubjectId,
    ) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM relationships
                WHERE resource_type = $1
                    AND resource_id = $2
                    AND relation = $3
                    AND subject_type = $4
                    AND subject_id = $5
            )
            "#,
        )
        .bind(resource.resource_type.as_str())
        .bind(resource.id.as_str())
        .bind(relation)
        .bind(PRINCIPAL_SUBJECT_TYPE)
        .bind(subject.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!(
                "failed to read relation '{relation}' on '{resource}': {error}"
            ))
        })
    }

    async fn object_subjects(
        &self,
        resource: &Resource,
        relation: &str,
    ) -> AppResult<Vec<Resource>> {
        let rows = sqlx::query_as::<_, ObjectSubjectRow>(
            r#"
            SELECT subject_type, subject_id
            FROM relationships
            WHERE resource_type = $1
                AND resource_id = $2
                AND relation = $3
                AND subject_type <> $4
            "#,
        )
        .bind(resource.resource_type.as_str())
        .bind(resource.id.as_str())
        .bind(relation)
        .bind(PRINCIPAL_SUBJECT_TYPE)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!(
                "failed to follow relation '{relation}' on '{resource}': {error}"
            ))
        })?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                RelationshipSubject::from_storage(&row.subject_type, &row.subject_id)
                    .as_object()
                    .cloned()
            })
            .collect())
    }
}

#[async_trait]
impl RelationshipStore for PostgresRelationshipStore {
    async fn check_access(
        &self,
        subject: &SubjectId,
        operation: &str,
        resource: &Resource,
    ) -> AppResult<AccessDecision> {
        self.graph.check(self, subject, operation, resource).await
    }

    async fn get_license(&self, key: &LicenseKey) -> AppResult<License> {
        let snapshot = self.read_snapshot(key, &[]).await?;
        License::new(key, snapshot.max_seats, snapshot.in_use)
    }

    async fn get_assigned(&self, key: &LicenseKey) -> AppResult<Vec<SubjectId>> {
        let rows = sqlx::query_scalar::<_, String>(
            r#"
            SELECT subject_id
            FROM relationships
            WHERE resource_type = 'license'
                AND resource_id = $1
                AND relation = 'assigned'
                AND subject_type = 'subject'
            "#,
        )
        .bind(key.resource_id())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::StoreUnavailable(format!(
                "failed to list seats of license '{key}': {error}"
            ))
        })?;

        Ok(rows.into_iter().map(SubjectId::from).collect())
    }

    async fn assign_seats(
        &self,
        subjects: &[SubjectId],
        key: &LicenseKey,
        service: &Service,
    ) -> AppResult<()> {
        ensure_service_matches(key, service)?;
        let batch = normalize_seat_batch(subjects)?;
        if batch.is_empty() {
            return Ok(());
        }

        self.run_seat_write(key, &batch, SeatWrite::Assign).await
    }

    async fn unassign_seats(
        &self,
        subjects: &[SubjectId],
        key: &LicenseKey,
        service: &Service,
    ) -> AppResult<()> {
        ensure_service_matches(key, service)?;
        let batch = normalize_seat_batch(subjects)?;
        if batch.is_empty() {
            return Ok(());
        }

        self.run_seat_write(key, &batch, SeatWrite::Unassign).await
    }
}

#[cfg(test)]
mod tests;
