use std::fmt::Display;

use crate::AppError;
use crate::auth::RequestContext;

/// Outcome recorded on an action log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    /// The action completed.
    Success,
    /// The action was refused by policy.
    Denied,
    /// The action failed.
    Failure,
}

impl ActionResult {
    /// Returns a stable log value for this result.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Denied => "denied",
            Self::Failure => "failure",
        }
    }

    /// Classifies an error as a policy refusal or a failure.
    #[must_use]
    pub fn for_error(error: &AppError) -> Self {
        match error {
            AppError::NotAuthenticated(_) | AppError::NotAuthorized(_) => Self::Denied,
            _ => Self::Failure,
        }
    }
}

/// Logger bound to one caller and one action.
///
/// Every event carries `action`, `result`, `src_ip`, `user`, `session` and
/// `account` fields taken from the owning [`RequestContext`].
#[derive(Debug, Clone, Copy)]
pub struct RequestLogger<'a> {
    context: &'a RequestContext,
    action: &'static str,
}

impl<'a> RequestLogger<'a> {
    /// Creates a logger for the given caller and action.
    #[must_use]
    pub fn new(context: &'a RequestContext, action: &'static str) -> Self {
        Self { context, action }
    }

    /// Emits an informational line with the given result.
    pub fn info(&self, result: ActionResult, message: impl Display) {
        tracing::info!(
            action = self.action,
            result = result.as_str(),
            src_ip = %self.src_ip(),
            user = self.context.claims().user(),
            session = self.session(),
            account = self.account(),
            "{message}"
        );
    }

    /// Emits a warning line with the given result.
    pub fn warn(&self, result: ActionResult, message: impl Display) {
        tracing::warn!(
            action = self.action,
            result = result.as_str(),
            src_ip = %self.src_ip(),
            user = self.context.claims().user(),
            session = self.session(),
            account = self.account(),
            "{message}"
        );
    }

    /// Emits an error line with the given result.
    pub fn error(&self, result: ActionResult, message: impl Display) {
        tracing::error!(
            action = self.action,
            result = result.as_str(),
            src_ip = %self.src_ip(),
            user = self.context.claims().user(),
            session = self.session(),
            account = self.account(),
            "{message}"
        );
    }

    fn src_ip(&self) -> String {
        self.context
            .remote_addr()
            .map(|address| address.to_string())
            .unwrap_or_default()
    }

    fn session(&self) -> &str {
        self.context
            .claims()
            .session_state
            .as_deref()
            .unwrap_or_default()
    }

    fn account(&self) -> &str {
        self.context
            .claims()
            .account_id
            .as_deref()
            .unwrap_or_default()
    }
}
