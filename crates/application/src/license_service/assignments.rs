use super::*;

use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

impl LicenseService {
    /// Lists either the seat holders of a license or the members who could
    /// receive a seat.
    pub async fn get_seat_assignments(
        &self,
        actor: &RequestContext,
        query: SeatAssignmentQuery,
    ) -> AppResult<Vec<Principal>> {
        let key = LicenseKey::new(query.org_id.as_str(), query.service_id.as_str())?;
        self.authorize_license(actor, "get_seats", &key, Operation::ViewLicense)
            .await?;

        let mut assigned = self.store.get_assigned(&key).await?;

        let ids = match query.filter {
            SeatFilter::Assigned => {
                assigned.sort();
                assigned.dedup();
                assigned
            }
            SeatFilter::Assignable => {
                let assigned: HashSet<SubjectId> = assigned.into_iter().collect();
                let members = self
                    .subjects
                    .get_by_org_id(key.org_id(), &CancellationToken::new())
                    .collect_all()
                    .await
                    .inspect_err(|error| {
                        actor
                            .logger("get_seats")
                            .error(ActionResult::Failure, error);
                    })?;

                let mut seen = HashSet::new();
                members
                    .into_iter()
                    .filter(|member| member.enabled)
                    .map(|member| member.subject_id)
                    .filter(|id| !assigned.contains(id) && seen.insert(id.clone()))
                    .collect()
            }
        };

        self.resolve_principals(ids, query.include_users).await
    }
}
