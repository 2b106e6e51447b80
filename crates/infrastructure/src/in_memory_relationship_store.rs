use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use seatkeeper_application::{RelationshipStore, normalize_seat_batch};
use seatkeeper_core::{AppError, AppResult};
use seatkeeper_domain::{
    AccessDecision, License, LicenseKey, PermissionSchema, Relation, Relationship,
    RelationshipSubject, Resource, ResourceType, Service, SubjectId,
};
use tokio::sync::{Mutex, RwLock};

use crate::permission_graph::{PermissionGraph, RelationshipReader};
use crate::seat_writes::{
    already_assigned, capacity_exceeded, ensure_service_matches, exceeds_capacity, not_assigned,
};

/// In-memory relationship store.
///
/// Seat mutations on one license key run under that key's async mutex.
#[derive(Debug)]
pub struct InMemoryRelationshipStore {
    graph: PermissionGraph,
    relationships: RwLock<HashSet<Relationship>>,
    licenses: RwLock<HashMap<LicenseKey, u32>>,
    license_locks: Mutex<HashMap<LicenseKey, Arc<Mutex<()>>>>,
}

impl InMemoryRelationshipStore {
    /// Creates an empty store evaluating the given schema.
    #[must_use]
    pub fn new(schema: Arc<PermissionSchema>) -> Self {
        Self::with_graph(PermissionGraph::new(schema))
    }

    /// Creates an empty store with a preconfigured evaluator.
    #[must_use]
    pub fn with_graph(graph: PermissionGraph) -> Self {
        Self {
            graph,
            relationships: RwLock::new(HashSet::new()),
            licenses: RwLock::new(HashMap::new()),
            license_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the seat limit of a license and links it to its organization.
    pub async fn provision_license(&self, key: &LicenseKey, max_seats: u32) -> AppResult<()> {
        let lock = self.license_lock(key).await;
        let _guard = lock.lock().await;

        let in_use = self.count_assigned(key).await;
        if in_use > max_seats {
            return Err(AppError::Validation(format!(
                "license '{key}' already has {in_use} seats in use, above {max_seats}"
            )));
        }

        self.licenses.write().await.insert(key.clone(), max_seats);
        self.relationships.write().await.insert(Relationship::new(
            Resource::license(key),
            Relation::Org,
            RelationshipSubject::object(Resource::org(key.org_id())),
        ));
        Ok(())
    }

    /// Writes one edge, serialized with seat mutations when it targets a license.
    pub async fn write_relationship(&self, relationship: Relationship) -> AppResult<()> {
        if !relationship.resource.is_type(ResourceType::License) {
            self.relationships.write().await.insert(relationship);
            return Ok(());
        }

        let key = LicenseKey::from_resource_id(relationship.resource.id.as_str())?;
        let lock = self.license_lock(&key).await;
        let _guard = lock.lock().await;

        self.relationships.write().await.insert(relationship);
        Ok(())
    }

    async fn license_lock(&self, key: &LicenseKey) -> Arc<Mutex<()>> {
        self.license_locks
            .lock()
            .await
            .entry(key.clone())
            .or_default()
            .clone()
    }

    async fn count_assigned(&self, key: &LicenseKey) -> u32 {
        let resource = Resource::license(key);
        let relationships = self.relationships.read().await;

        let count = relationships
            .iter()
            .filter(|edge| is_seat_edge(edge, &resource))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    fn seat_edge(key: &LicenseKey, subject: &SubjectId) -> Relationship {
        Relationship::new(
            Resource::license(key),
            Relation::Assigned,
            RelationshipSubject::principal(subject.clone()),
        )
    }
}

impl Default for InMemoryRelationshipStore {
    fn default() -> Self {
        Self::new(Arc::new(PermissionSchema::builtin()))
    }
}

fn is_seat_edge(edge: &Relationship, license: &Resource) -> bool {
    &edge.resource == license
        && edge.relation == Relation::Assigned.as_str()
        && edge.subject.as_principal().is_some()
}

#[async_trait]
impl RelationshipReader for InMemoryRelationshipStore {
    async fn has_relationship(
        &self,
        resource: &Resource,
        relation: &str,
        subject: &SubjectId,
    ) -> AppResult<bool> {
        let edge = Relationship {
            resource: resource.clone(),
            relation: relation.to_owned(),
            subject: RelationshipSubject::principal(subject.clone()),
        };

        Ok(self.relationships.read().await.contains(&edge))
    }

    async fn object_subjects(
        &self,
        resource: &Resource,
        relation: &str,
    ) -> AppResult<Vec<Resource>> {
        let relationships = self.relationships.read().await;

        Ok(relationships
            .iter()
            .filter(|edge| &edge.resource == resource && edge.relation == relation)
            .filter_map(|edge| edge.subject.as_object().cloned())
            .collect())
    }
}

#[async_trait]
impl RelationshipStore for InMemoryRelationshipStore {
    async fn check_access(
        &self,
        subject: &SubjectId,
        operation: &str,
        resource: &Resource,
    ) -> AppResult<AccessDecision> {
        self.graph.check(self, subject, operation, resource).await
    }

    async fn get_license(&self, key: &LicenseKey) -> AppResult<License> {
        // Holding the limit guard keeps provisioning out until the count is read.
        let licenses = self.licenses.read().await;
        let max_seats = licenses.get(key).copied().unwrap_or(0);
        let in_use = self.count_assigned(key).await;
        drop(licenses);

        License::new(key, max_seats, in_use)
    }

    async fn get_assigned(&self, key: &LicenseKey) -> AppResult<Vec<SubjectId>> {
        let resource = Resource::license(key);
        let relationships = self.relationships.read().await;

        Ok(relationships
            .iter()
            .filter(|edge| is_seat_edge(edge, &resource))
            .filter_map(|edge| edge.subject.as_principal().cloned())
            .collect())
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

        let lock = self.license_lock(key).await;
        let _guard = lock.lock().await;

        let edges: Vec<Relationship> = batch
            .iter()
            .map(|subject| Self::seat_edge(key, subject))
            .collect();
        let max_seats = self.licenses.read().await.get(key).copied().unwrap_or(0);

        let mut relationships = self.relationships.write().await;
        let held: Vec<SubjectId> = batch
            .iter()
            .zip(&edges)
            .filter(|(_, edge)| relationships.contains(*edge))
            .map(|(subject, _)| subject.clone())
            .collect();
        if !held.is_empty() {
            return Err(already_assigned(key, &held));
        }

        let resource = Resource::license(key);
        let in_use = u32::try_from(
            relationships
                .iter()
                .filter(|edge| is_seat_edge(edge, &resource))
                .count(),
        )
        .unwrap_or(u32::MAX);
        if exceeds_capacity(batch.len(), in_use, max_seats) {
            return Err(capacity_exceeded(key, batch.len(), in_use, max_seats));
        }

        relationships.extend(edges);
        Ok(())
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

        let lock = self.license_lock(key).await;
        let _guard = lock.lock().await;

        let edges: Vec<Relationship> = batch
            .iter()
            .map(|subject| Self::seat_edge(key, subject))
            .collect();

        let mut relationships = self.relationships.write().await;
        let missing: Vec<SubjectId> = batch
            .iter()
            .zip(&edges)
            .filter(|(_, edge)| !relationships.contains(*edge))
            .map(|(subject, _)| subject.clone())
            .collect();
        if !missing.is_empty() {
            return Err(not_assigned(key, &missing));
        }

        for edge in &edges {
            relationships.remove(edge);
        }
        Ok(())
    }
}
