use std::sync::Arc;

use seatkeeper_core::{ActionResult, AppResult, RequestContext};
use seatkeeper_domain::{CheckEvent, LicenseKey, Operation, Principal, Resource, SubjectId};

use crate::{AccessService, PrincipalRepository, RelationshipStore, SubjectRepository};

mod assignments;
mod seats;

/// Seat limit and free seats of one license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatCounts {
    /// Provisioned seat limit.
    pub limit: u32,
    /// Seats not currently assigned.
    pub available: u32,
}

/// Input payload for a seat modification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifySeatsInput {
    /// Organization identifier.
    pub org_id: String,
    /// Service identifier.
    pub service_id: String,
    /// Subjects receiving a seat.
    pub assign: Vec<String>,
    /// Subjects losing their seat.
    pub unassign: Vec<String>,
}

/// Which side of the license a seat listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SeatFilter {
    /// Subjects currently holding a seat.
    #[default]
    Assigned,
    /// Enabled organization members without a seat.
    Assignable,
}

impl SeatFilter {
    /// Parses a transport filter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "assigned" => Some(Self::Assigned),
            "assignable" => Some(Self::Assignable),
            _ => None,
        }
    }
}

/// Query parameters for a seat listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatAssignmentQuery {
    /// Organization identifier.
    pub org_id: String,
    /// Service identifier.
    pub service_id: String,
    /// Resolve display metadata through the principal directory.
    pub include_users: bool,
    /// Listing side.
    pub filter: SeatFilter,
}

/// Application service enforcing seat capacity on licenses.
#[derive(Clone)]
pub struct LicenseService {
    access_service: AccessService,
    store: Arc<dyn RelationshipStore>,
    principals: Arc<dyn PrincipalRepository>,
    subjects: Arc<dyn SubjectRepository>,
}

impl LicenseService {
    /// Creates a new license service.
    #[must_use]
    pub fn new(
        access_service: AccessService,
        store: Arc<dyn RelationshipStore>,
        principals: Arc<dyn PrincipalRepository>,
        subjects: Arc<dyn SubjectRepository>,
    ) -> Self {
        Self {
            access_service,
            store,
            principals,
            subjects,
        }
    }

    async fn authorize_license(
        &self,
        actor: &RequestContext,
        action: &'static str,
        key: &LicenseKey,
        operation: Operation,
    ) -> AppResult<()> {
        let event = CheckEvent::for_self(
            SubjectId::from(actor.requestor()),
            operation,
            Resource::license(key),
        );

        if let Err(error) = self.access_service.authorize(&event).await {
            actor
                .logger(action)
                .warn(ActionResult::for_error(&error), &error);
            return Err(error);
        }

        Ok(())
    }

    async fn resolve_principals(
        &self,
        ids: Vec<SubjectId>,
        include_users: bool,
    ) -> AppResult<Vec<Principal>> {
        if !include_users {
            return Ok(ids.into_iter().map(Principal::minimal).collect());
        }

        self.principals.get_by_ids(&ids).await
    }
}
