use std::sync::Arc;

use seatkeeper_core::{ActionResult, AppError, AppResult, RequestContext};
use seatkeeper_domain::{AccessDecision, CheckEvent, Operation, Resource, SubjectId};

use crate::RelationshipStore;

/// Input payload for a transport-level permission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPermissionInput {
    /// Subject whose access is evaluated.
    pub subject: String,
    /// Operation name.
    pub operation: String,
    /// Resource type name.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
}

/// Application service resolving authorization questions.
#[derive(Clone)]
pub struct AccessService {
    store: Arc<dyn RelationshipStore>,
}

impl AccessService {
    /// Creates a new access service from a store implementation.
    #[must_use]
    pub fn new(store: Arc<dyn RelationshipStore>) -> Self {
        Self { store }
    }

    /// Answers a permission question on behalf of the calling requestor.
    pub async fn check_permission(
        &self,
        actor: &RequestContext,
        input: CheckPermissionInput,
    ) -> AppResult<AccessDecision> {
        let logger = actor.logger("check_permission");
        let event = CheckEvent {
            requestor: SubjectId::from(actor.requestor()),
            subject_id: SubjectId::from(input.subject),
            operation: input.operation,
            resource: Resource::new(input.resource_type, input.resource_id),
        };

        match self.check(&event).await {
            Ok(decision) => {
                let verdict = if decision.is_allowed() {
                    "allowed"
                } else {
                    "denied"
                };
                logger.info(
                    ActionResult::Success,
                    format!(
                        "'{}' {verdict} '{}' on '{}'",
                        event.subject_id, event.operation, event.resource
                    ),
                );
                Ok(decision)
            }
            Err(error) => {
                logger.warn(ActionResult::for_error(&error), &error);
                Err(error)
            }
        }
    }

    /// Resolves one check event into a decision.
    ///
    /// Anonymous requestors are rejected. A requestor asking about another
    /// subject must hold `administer` on the event's resource.
    pub async fn check(&self, event: &CheckEvent) -> AppResult<AccessDecision> {
        if event.requestor.is_anonymous() {
            return Err(AppError::NotAuthenticated(
                "anonymous access is not allowed".to_owned(),
            ));
        }

        if event.is_delegated() {
            let delegation = self
                .store
                .check_access(
                    &event.requestor,
                    Operation::Administer.as_str(),
                    &event.resource,
                )
                .await?;

            if !delegation.is_allowed() {
                return Err(AppError::NotAuthorized(format!(
                    "requestor '{}' may not check access of '{}' on '{}'",
                    event.requestor, event.subject_id, event.resource
                )));
            }
        }

        self.store
            .check_access(&event.subject_id, event.operation.as_str(), &event.resource)
            .await
    }

    /// Ensures the check event is allowed.
    pub async fn authorize(&self, event: &CheckEvent) -> AppResult<()> {
        if self.check(event).await?.is_allowed() {
            return Ok(());
        }

        Err(AppError::NotAuthorized(format!(
            "subject '{}' is missing '{}' on '{}'",
            event.subject_id, event.operation, event.resource
        )))
    }
}

#[cfg(test)]
mod tests;
