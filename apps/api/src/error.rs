use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use seatkeeper_core::AppError;

mod types;

pub use types::ErrorResponse;

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, &'static str) {
        match self.0 {
            AppError::NotAuthenticated(_) => (
                StatusCode::UNAUTHORIZED,
                "Anonymous access is not allowed.",
            ),
            AppError::NotAuthorized(_) => (StatusCode::FORBIDDEN, "Access denied."),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error."),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!(kind = self.0.kind(), error = %self.0, "request failed");
        } else {
            tracing::info!(kind = self.0.kind(), error = %self.0, "request refused");
        }

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
