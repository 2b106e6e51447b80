//! Shared precondition helpers for seat mutations.

use seatkeeper_core::{AppError, AppResult};
use seatkeeper_domain::{LicenseKey, Service, SubjectId};

pub(crate) fn ensure_service_matches(key: &LicenseKey, service: &Service) -> AppResult<()> {
    if service.id != key.service_id() {
        return Err(AppError::Validation(format!(
            "service '{}' does not match license '{key}'",
            service.id
        )));
    }

    Ok(())
}

pub(crate) fn already_assigned(key: &LicenseKey, subjects: &[SubjectId]) -> AppError {
    AppError::AlreadyAssigned(format!(
        "{} already hold a seat on license '{key}'",
        quoted(subjects)
    ))
}

pub(crate) fn not_assigned(key: &LicenseKey, subjects: &[SubjectId]) -> AppError {
    AppError::NotAssigned(format!(
        "{} hold no seat on license '{key}'",
        quoted(subjects)
    ))
}

pub(crate) fn capacity_exceeded(
    key: &LicenseKey,
    requested: usize,
    in_use: u32,
    max_seats: u32,
) -> AppError {
    AppError::CapacityExceeded(format!(
        "license '{key}' has {} of {max_seats} seats free, {requested} requested",
        max_seats.saturating_sub(in_use)
    ))
}

pub(crate) fn exceeds_capacity(requested: usize, in_use: u32, max_seats: u32) -> bool {
    u64::from(in_use) + requested as u64 > u64::from(max_seats)
}

fn quoted(subjects: &[SubjectId]) -> String {
    subjects
        .iter()
        .map(|subject| format!("'{subject}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
