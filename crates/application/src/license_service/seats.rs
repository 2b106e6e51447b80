use super::*;

use seatkeeper_domain::Service;

use crate::normalize_seat_batch;

impl LicenseService {
    /// Returns the seat limit and free seats of a license.
    pub async fn get_seat_counts(
        &self,
        actor: &RequestContext,
        org_id: &str,
        service_id: &str,
    ) -> AppResult<SeatCounts> {
        let key = LicenseKey::new(org_id, service_id)?;
        self.authorize_license(actor, "get_license", &key, Operation::ViewLicense)
            .await?;

        let license = self.store.get_license(&key).await?;

        Ok(SeatCounts {
            limit: license.max_seats,
            available: license.available(),
        })
    }

    /// Unassigns and then assigns seats on a license.
    ///
    /// The two halves are independent atomic writes. When the unassign half
    /// succeeds and the assign half fails, the unassign stands and the assign
    /// error is returned.
    pub async fn modify_seats(
        &self,
        actor: &RequestContext,
        input: ModifySeatsInput,
    ) -> AppResult<()> {
        let key = LicenseKey::new(input.org_id.as_str(), input.service_id.as_str())?;
        self.authorize_license(actor, "modify_seats", &key, Operation::ManageSeats)
            .await?;

        let logger = actor.logger("modify_seats");
        let service = Service::new(key.service_id());
        let unassign = normalize_seat_batch(&into_subject_ids(input.unassign))?;
        let assign = normalize_seat_batch(&into_subject_ids(input.assign))?;

        if !unassign.is_empty() {
            if let Err(error) = self.store.unassign_seats(&unassign, &key, &service).await {
                logger.warn(
                    ActionResult::for_error(&error),
                    format!("unassigning {} seats on '{key}' failed: {error}", unassign.len()),
                );
                return Err(error);
            }

            logger.info(
                ActionResult::Success,
                format!("unassigned {} seats on '{key}'", unassign.len()),
            );
        }

        if !assign.is_empty() {
            if let Err(error) = self.store.assign_seats(&assign, &key, &service).await {
                logger.warn(
                    ActionResult::for_error(&error),
                    format!("assigning {} seats on '{key}' failed: {error}", assign.len()),
                );
                return Err(error);
            }

            logger.info(
                ActionResult::Success,
                format!("assigned {} seats on '{key}'", assign.len()),
            );
        }

        Ok(())
    }
}

fn into_subject_ids(values: Vec<String>) -> Vec<SubjectId> {
    values.into_iter().map(SubjectId::from).collect()
}
