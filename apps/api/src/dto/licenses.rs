use seatkeeper_application::SeatCounts;
use seatkeeper_domain::Principal;
use serde::{Deserialize, Serialize};

/// Seat totals of one license.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetLicenseResponse {
    pub seats_total: u32,
    pub seats_available: u32,
}

impl From<SeatCounts> for GetLicenseResponse {
    fn from(value: SeatCounts) -> Self {
        Self {
            seats_total: value.limit,
            seats_available: value.available,
        }
    }
}

/// Query string of a seat listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetSeatsQuery {
    pub include_users: Option<bool>,
    pub filter: Option<String>,
}

/// One user in a seat listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatUserResponse {
    pub id: String,
    pub display_name: String,
    pub assigned: bool,
}

impl SeatUserResponse {
    pub fn from_principal(principal: Principal, assigned: bool) -> Self {
        Self {
            id: principal.id.into(),
            display_name: principal.display_name.unwrap_or_default(),
            assigned,
        }
    }
}

/// Seat listing payload.
#[derive(Debug, Serialize)]
pub struct GetSeatsResponse {
    pub users: Vec<SeatUserResponse>,
}

/// Incoming seat modification.
#[derive(Debug, Default, Deserialize)]
pub struct ModifySeatsRequest {
    #[serde(default)]
    pub assign: Vec<String>,
    #[serde(default)]
    pub unassign: Vec<String>,
}
