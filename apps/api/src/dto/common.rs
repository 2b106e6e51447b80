use serde::Serialize;

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Empty JSON object returned by mutations.
#[derive(Debug, Default, Serialize)]
pub struct EmptyResponse {}
