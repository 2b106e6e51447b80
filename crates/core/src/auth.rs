use std::net::IpAddr;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::logging::RequestLogger;

/// Claims read from a bearer token payload for logging context.
///
/// Claims are decoded without signature verification and must never feed an
/// authorization decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenClaims {
    /// Login name of the token subject.
    #[serde(default)]
    pub username: Option<String>,
    /// Preferred display login of the token subject.
    #[serde(default)]
    pub preferred_username: Option<String>,
    /// Identity provider session identifier.
    #[serde(default)]
    pub session_state: Option<String>,
    /// Organization account the token was issued for.
    #[serde(default)]
    pub account_id: Option<String>,
}

impl TokenClaims {
    /// Returns the login name, falling back to the preferred username.
    #[must_use]
    pub fn user(&self) -> &str {
        self.username
            .as_deref()
            .filter(|value| !value.is_empty())
            .or(self.preferred_username.as_deref())
            .unwrap_or_default()
    }

    /// Decodes claims from a raw token value.
    ///
    /// Returns empty claims for anything that is not a JWT-shaped token with a
    /// JSON object payload.
    #[must_use]
    pub fn from_token(token: &str) -> Self {
        let mut segments = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Self::default();
        };

        URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Self>(&bytes).ok())
            .unwrap_or_default()
    }
}

/// Caller information resolved once at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    requestor: String,
    claims: TokenClaims,
    remote_addr: Option<IpAddr>,
}

impl RequestContext {
    /// Creates a context for the given requestor identity.
    #[must_use]
    pub fn new(requestor: impl Into<String>, claims: TokenClaims) -> Self {
        Self {
            requestor: requestor.into(),
            claims,
            remote_addr: None,
        }
    }

    /// Creates a context without any caller identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(String::new(), TokenClaims::default())
    }

    /// Attaches the caller's source address.
    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: Option<IpAddr>) -> Self {
        self.remote_addr = remote_addr;
        self
    }

    /// Returns the requestor identity, empty when anonymous.
    #[must_use]
    pub fn requestor(&self) -> &str {
        self.requestor.as_str()
    }

    /// Returns the decoded token claims.
    #[must_use]
    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// Returns the caller's source address, if known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    /// Builds a logger carrying this caller's fields for one action.
    #[must_use]
    pub fn logger(&self, action: &'static str) -> RequestLogger<'_> {
        RequestLogger::new(self, action)
    }
}
