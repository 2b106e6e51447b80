use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use seatkeeper_core::{AppError, AppResult, RequestContext, TokenClaims};
use seatkeeper_domain::{
    AccessDecision, CheckEvent, License, LicenseKey, Operation, Resource, Service, SubjectId,
};
use tokio::sync::Mutex;

use crate::RelationshipStore;

use super::{AccessService, CheckPermissionInput};

#[derive(Default)]
struct FakeRelationshipStore {
    grants: HashSet<(String, String, Resource)>,
    fail_checks: bool,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeRelationshipStore {
    fn with_grant(mut self, subject: &str, operation: Operation, resource: Resource) -> Self {
        self.grants
            .insert((subject.to_owned(), operation.as_str().to_owned(), resource));
        self
    }
}

#[async_trait]
impl RelationshipStore for FakeRelationshipStore {
    async fn check_access(
        &self,
        subject: &SubjectId,
        operation: &str,
        resource: &Resource,
    ) -> AppResult<AccessDecision> {
        self.calls
            .lock()
            .await
            .push((subject.to_string(), operation.to_owned()));

        if self.fail_checks {
            return Err(AppError::StoreUnavailable("connection reset".to_owned()));
        }

        Ok(AccessDecision::from(self.grants.contains(&(
            subject.to_string(),
            operation.to_owned(),
            resource.clone(),
        ))))
    }

    async fn get_license(&self, key: &LicenseKey) -> AppResult<License> {
        License::new(key, 0, 0)
    }

    async fn get_assigned(&self, _key: &LicenseKey) -> AppResult<Vec<SubjectId>> {
        Ok(Vec::new())
    }

    async fn assign_seats(
        &self,
        _subjects: &[SubjectId],
        _key: &LicenseKey,
        _service: &Service,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn unassign_seats(
        &self,
        _subjects: &[SubjectId],
        _key: &LicenseKey,
        _service: &Service,
    ) -> AppResult<()> {
        Ok(())
    }
}

fn license() -> Resource {
    Resource::new("license", "o1/smarts")
}

fn event(requestor: &str, subject: &str, operation: Operation) -> CheckEvent {
    CheckEvent {
        requestor: SubjectId::from(requestor),
        subject_id: SubjectId::from(subject),
        operation: operation.as_str().to_owned(),
        resource: license(),
    }
}

#[tokio::test]
async fn self_check_returns_store_decision() {
    let store = FakeRelationshipStore::default().with_grant("u1", Operation::Access, license());
    let service = AccessService::new(Arc::new(store));

    let allowed = service.check(&event("u1", "u1", Operation::Access)).await;
    assert!(matches!(allowed, Ok(AccessDecision::Allowed)));

    let denied = service.check(&event("u2", "u2", Operation::Access)).await;
    assert!(matches!(denied, Ok(AccessDecision::Denied)));
}

#[tokio::test]
async fn anonymous_requestor_is_not_authenticated() {
    let store = Arc::new(FakeRelationshipStore::default());
    let service = AccessService::new(store.clone());

    let result = service.check(&event("", "", Operation::Access)).await;
    assert!(matches!(result, Err(AppError::NotAuthenticated(_))));
    assert!(store.calls.lock().await.is_empty());
}

#[tokio::test]
async fn delegated_check_requires_administer_on_resource() {
    let store = FakeRelationshipStore::default().with_grant("u2", Operation::Access, license());
    let service = AccessService::new(Arc::new(store));

    let result = service.check(&event("u1", "u2", Operation::Access)).await;
    assert!(matches!(result, Err(AppError::NotAuthorized(_))));
}

#[tokio::test]
async fn delegated_check_by_administrator_evaluates_subject() {
    let store = FakeRelationshipStore::default()
        .with_grant("admin", Operation::Administer, license())
        .with_grant("u2", Operation::Access, license());
    let store = Arc::new(store);
    let service = AccessService::new(store.clone());

    let allowed = service.check(&event("admin", "u2", Operation::Access)).await;
    assert!(matches!(allowed, Ok(AccessDecision::Allowed)));

    let denied = service.check(&event("admin", "u3", Operation::Access)).await;
    assert!(matches!(denied, Ok(AccessDecision::Denied)));

    let calls = store.calls.lock().await;
    assert_eq!(
        calls.first(),
        Some(&("admin".to_owned(), "administer".to_owned()))
    );
    assert_eq!(calls.get(1), Some(&("u2".to_owned(), "access".to_owned())));
}

#[tokio::test]
async fn authorize_maps_denied_to_not_authorized() {
    let store =
        FakeRelationshipStore::default().with_grant("u1", Operation::ViewLicense, license());
    let service = AccessService::new(Arc::new(store));

    assert!(
        service
            .authorize(&event("u1", "u1", Operation::ViewLicense))
            .await
            .is_ok()
    );
    let result = service
        .authorize(&event("u1", "u1", Operation::ManageSeats))
        .await;
    assert!(matches!(result, Err(AppError::NotAuthorized(_))));
}

#[tokio::test]
async fn store_failure_is_not_reported_as_denied() {
    let store = FakeRelationshipStore {
        fail_checks: true,
        ..FakeRelationshipStore::default()
    };
    let service = AccessService::new(Arc::new(store));

    let result = service.check(&event("u1", "u1", Operation::Access)).await;
    assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
}

#[tokio::test]
async fn check_permission_uses_context_requestor() {
    let store = FakeRelationshipStore::default().with_grant("u1", Operation::Access, license());
    let service = AccessService::new(Arc::new(store));
    let actor = RequestContext::new("u1", TokenClaims::default());

    let result = service
        .check_permission(
            &actor,
            CheckPermissionInput {
                subject: "u1".to_owned(),
                operation: "access".to_owned(),
                resource_type: "license".to_owned(),
                resource_id: "o1/smarts".to_owned(),
            },
        )
        .await;
    assert!(matches!(result, Ok(AccessDecision::Allowed)));

    let anonymous = service
        .check_permission(
            &RequestContext::anonymous(),
            CheckPermissionInput {
                subject: "u1".to_owned(),
                operation: "access".to_owned(),
                resource_type: "license".to_owned(),
                resource_id: "o1/smarts".to_owned(),
            },
        )
        .await;
    assert!(matches!(anonymous, Err(AppError::NotAuthenticated(_))));
}
