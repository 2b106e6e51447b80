mod access;
mod common;
mod licenses;

pub use access::{CheckPermissionRequest, CheckPermissionResponse};
pub use common::{EmptyResponse, HealthResponse};
pub use licenses::{
    GetLicenseResponse, GetSeatsQuery, GetSeatsResponse, ModifySeatsRequest, SeatUserResponse,
};
