//! Shared primitives for all Rust crates in Seatkeeper.

#![forbid(unsafe_code)]

/// Caller identity and token claims shared across services.
pub mod auth;
/// Explicit per-request structured logging.
pub mod logging;

use thiserror::Error;

pub use auth::{RequestContext, TokenClaims};
pub use logging::{ActionResult, RequestLogger};

/// Result type used across Seatkeeper crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Requestor identity is missing or empty.
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),

    /// Requestor is authenticated but the decision was denied.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// At least one subject in an assign batch already holds a seat.
    #[error("already assigned: {0}")]
    AlreadyAssigned(String),

    /// At least one subject in an unassign batch holds no seat.
    #[error("not assigned: {0}")]
    NotAssigned(String),

    /// An assign batch would push seats in use above the licensed maximum.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// The backing relationship store failed or stayed contended.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The subject directory integration failed.
    #[error("directory unavailable: {0}")]
    DirectoryUnavailable(String),

    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns a stable short name for the error category.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotAuthenticated(_) => "not_authenticated",
            Self::NotAuthorized(_) => "not_authorized",
            Self::AlreadyAssigned(_) => "already_assigned",
            Self::NotAssigned(_) => "not_assigned",
            Self::CapacityExceeded(_) => "capacity_exceeded",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::DirectoryUnavailable(_) => "directory_unavailable",
            Self::Validation(_) => "validation",
            Self::Internal(_) => "internal",
        }
    }
}
