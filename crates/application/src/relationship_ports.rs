use std::collections::HashSet;

use async_trait::async_trait;
use seatkeeper_core::{AppError, AppResult};
use seatkeeper_domain::{AccessDecision, License, LicenseKey, Resource, Service, SubjectId};

/// Port to the relationship-graph permission store.
///
/// Implementations are the only writers of seat edges and own the capacity
/// invariant: after any successful call, `0 <= in_use <= max_seats` holds for
/// every license. Mutations on one license key are serialized; different keys
/// never contend.
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Evaluates whether `subject` may perform `operation` on `resource`.
    ///
    /// Unknown subjects, resources or operations yield `Denied`. Errors are
    /// reserved for store failures.
    async fn check_access(
        &self,
        subject: &SubjectId,
        operation: &str,
        resource: &Resource,
    ) -> AppResult<AccessDecision>;

    /// Reads seat limit and seats in use from one consistent snapshot.
    async fn get_license(&self, key: &LicenseKey) -> AppResult<License>;

    /// Lists subjects holding a seat. Order is unspecified.
    async fn get_assigned(&self, key: &LicenseKey) -> AppResult<Vec<SubjectId>>;

    /// Assigns a seat to every subject in the batch, or to none.
    ///
    /// Fails with `AlreadyAssigned` if any subject holds a seat and with
    /// `CapacityExceeded` if the batch does not fit.
    async fn assign_seats(
        &self,
        subjects: &[SubjectId],
        key: &LicenseKey,
        service: &Service,
    ) -> AppResult<()>;

    /// Removes the seat of every subject in the batch, or of none.
    ///
    /// Fails with `NotAssigned` if any subject holds no seat.
    async fn unassign_seats(
        &self,
        subjects: &[SubjectId],
        key: &LicenseKey,
        service: &Service,
    ) -> AppResult<()>;
}

/// Deduplicates a seat batch in first-seen order and rejects anonymous ids.
pub fn normalize_seat_batch(subjects: &[SubjectId]) -> AppResult<Vec<SubjectId>> {
    let mut seen = HashSet::with_capacity(subjects.len());
    let mut batch = Vec::with_capacity(subjects.len());

    for subject in subjects {
        if subject.is_anonymous() {
            return Err(AppError::Validation(
                "seat batches must not contain an empty subject id".to_owned(),
            ));
        }

        if seen.insert(subject) {
            batch.push(subject.clone());
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use seatkeeper_domain::SubjectId;

    use super::normalize_seat_batch;

    #[test]
    fn duplicates_collapse_in_first_seen_order() {
        let batch = normalize_seat_batch(&[
            SubjectId::from("u2"),
            SubjectId::from("u1"),
            SubjectId::from("u2"),
        ]);

        assert!(batch.is_ok());
        assert_eq!(
            batch.unwrap_or_default(),
            vec![SubjectId::from("u2"), SubjectId::from("u1")]
        );
    }

    #[test]
    fn anonymous_subject_is_rejected() {
        let batch = normalize_seat_batch(&[SubjectId::from("u1"), SubjectId::anonymous()]);
        assert!(batch.is_err());
    }
}
