//! Subject identity and directory metadata.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Opaque identity of a user or service principal.
///
/// Equality is exact-string. The empty identifier is reserved for anonymous
/// callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Creates a subject identifier from any string value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the anonymous subject identifier.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(String::new())
    }

    /// Returns whether this identifier denotes an anonymous caller.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for SubjectId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

impl From<&str> for SubjectId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SubjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.0
    }
}

/// Subject metadata resolved from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Subject identifier, empty for the anonymous principal.
    pub id: SubjectId,
    /// Human-readable name when the directory knows one.
    pub display_name: Option<String>,
}

impl Principal {
    /// Creates a principal with a display name.
    #[must_use]
    pub fn new(id: impl Into<SubjectId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(display_name.into()),
        }
    }

    /// Creates a principal that carries only its identifier.
    #[must_use]
    pub fn minimal(id: impl Into<SubjectId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    /// Returns the anonymous principal.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::minimal(SubjectId::anonymous())
    }

    /// Returns whether this is the anonymous principal.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id.is_anonymous()
    }
}

/// Organization member as reported by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Member identifier.
    pub subject_id: SubjectId,
    /// Whether the member account is enabled.
    pub enabled: bool,
}

impl Subject {
    /// Creates a directory subject.
    #[must_use]
    pub fn new(subject_id: impl Into<SubjectId>, enabled: bool) -> Self {
        Self {
            subject_id: subject_id.into(),
            enabled,
        }
    }
}
