use serde::Serialize;

/// API error payload.
///
/// Carries only a fixed message; error detail stays in the server log.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: &'static str,
}

impl ErrorResponse {
    pub(super) fn new(message: &'static str) -> Self {
        Self { message }
    }
}
