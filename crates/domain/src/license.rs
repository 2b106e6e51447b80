//! License capacity records.

use std::fmt::{Display, Formatter};

use seatkeeper_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// A licensable product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Service {
    /// Service identifier.
    pub id: String,
}

impl Service {
    /// Creates a service reference.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Identifies one organization's license for one service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LicenseKey {
    org_id: String,
    service_id: String,
}

impl LicenseKey {
    /// Creates a validated license key.
    ///
    /// The organization identifier must not contain `/` so the composite
    /// resource identifier stays unambiguous.
    pub fn new(org_id: impl Into<String>, service_id: impl Into<String>) -> AppResult<Self> {
        let org_id = org_id.into();
        let service_id = service_id.into();

        if org_id.trim().is_empty() {
            return Err(AppError::Validation(
                "org id must not be empty or whitespace".to_owned(),
            ));
        }

        if org_id.contains('/') {
            return Err(AppError::Validation(format!(
                "org id '{org_id}' must not contain '/'"
            )));
        }

        if service_id.trim().is_empty() {
            return Err(AppError::Validation(
                "service id must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self { org_id, service_id })
    }

    /// Parses a license resource identifier of the form `<org>/<service>`.
    pub fn from_resource_id(resource_id: &str) -> AppResult<Self> {
        let (org_id, service_id) = resource_id.split_once('/').ok_or_else(|| {
            AppError::Validation(format!(
                "license resource id '{resource_id}' must have the form '<org>/<service>'"
            ))
        })?;

        Self::new(org_id, service_id)
    }

    /// Returns the organization identifier.
    #[must_use]
    pub fn org_id(&self) -> &str {
        self.org_id.as_str()
    }

    /// Returns the service identifier.
    #[must_use]
    pub fn service_id(&self) -> &str {
        self.service_id.as_str()
    }

    /// Returns the composite license resource identifier.
    #[must_use]
    pub fn resource_id(&self) -> String {
        format!("{}/{}", self.org_id, self.service_id)
    }
}

impl Display for LicenseKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}/{}", self.org_id, self.service_id)
    }
}

/// Capacity record for one organization and service.
///
/// `in_use` never exceeds `max_seats` on a successfully constructed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Organization identifier.
    pub org_id: String,
    /// Service identifier.
    pub service_id: String,
    /// Provisioned seat limit.
    pub max_seats: u32,
    /// Seats currently assigned.
    pub in_use: u32,
}

impl License {
    /// Creates a license snapshot, rejecting overbooked states.
    pub fn new(key: &LicenseKey, max_seats: u32, in_use: u32) -> AppResult<Self> {
        if in_use > max_seats {
            return Err(AppError::Internal(format!(
                "license '{key}' reports {in_use} seats in use above its limit of {max_seats}"
            )));
        }

        Ok(Self {
            org_id: key.org_id().to_owned(),
            service_id: key.service_id().to_owned(),
            max_seats,
            in_use,
        })
    }

    /// Returns the number of seats still free.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.max_seats - self.in_use
    }
}
