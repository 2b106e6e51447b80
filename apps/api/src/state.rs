use seatkeeper_application::{AccessService, LicenseService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub access_service: AccessService,
    pub license_service: LicenseService,
}
