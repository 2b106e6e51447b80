use serde::{Deserialize, Serialize};

use crate::access::Resource;
use crate::subject::SubjectId;

/// Storage type name used for principal subjects.
const PRINCIPAL_SUBJECT_TYPE: &str = "subject";

/// Relations known to the built-in permission schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Seat held by a subject on a license.
    Assigned,
    /// Administrative relation on a license or organization.
    Admin,
    /// Organization membership.
    Member,
    /// Link from a license to its owning organization.
    Org,
}

impl Relation {
    /// Returns the stable relation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Org => "org",
        }
    }
}

/// Subject side of a relationship edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipSubject {
    /// A user or service principal.
    Principal {
        /// Principal identifier.
        id: SubjectId,
    },
    /// Another object, followed by arrow rules.
    Object {
        /// Referenced object.
        resource: Resource,
    },
}

impl RelationshipSubject {
    /// Creates a principal subject.
    #[must_use]
    pub fn principal(id: impl Into<SubjectId>) -> Self {
        Self::Principal { id: id.into() }
    }

    /// Creates an object subject.
    #[must_use]
    pub fn object(resource: Resource) -> Self {
        Self::Object { resource }
    }

    /// Returns the storage type name of this subject.
    #[must_use]
    pub fn storage_type(&self) -> &str {
        match self {
            Self::Principal { .. } => PRINCIPAL_SUBJECT_TYPE,
            Self::Object { resource } => resource.resource_type.as_str(),
        }
    }

    /// Returns the storage identifier of this subject.
    #[must_use]
    pub fn storage_id(&self) -> &str {
        match self {
            Self::Principal { id } => id.as_str(),
            Self::Object { resource } => resource.id.as_str(),
        }
    }

    /// Rebuilds a subject from its storage columns.
    #[must_use]
    pub fn from_storage(subject_type: &str, subject_id: &str) -> Self {
        if subject_type == PRINCIPAL_SUBJECT_TYPE {
            Self::principal(subject_id)
        } else {
            Self::object(Resource::new(subject_type, subject_id))
        }
    }

    /// Returns the principal identifier when this is a principal subject.
    #[must_use]
    pub fn as_principal(&self) -> Option<&SubjectId> {
        match self {
            Self::Principal { id } => Some(id),
            Self::Object { .. } => None,
        }
    }

    /// Returns the referenced object when this is an object subject.
    #[must_use]
    pub fn as_object(&self) -> Option<&Resource> {
        match self {
            Self::Principal { .. } => None,
            Self::Object { resource } => Some(resource),
        }
    }
}

/// One `(resource, relation, subject)` edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    /// Object side of the edge.
    pub resource: Resource,
    /// Relation name.
    pub relation: String,
    /// Subject side of the edge.
    pub subject: RelationshipSubject,
}

impl Relationship {
    /// Creates an edge.
    #[must_use]
    pub fn new(resource: Resource, relation: Relation, subject: RelationshipSubject) -> Self {
        Self {
            resource,
            relation: relation.as_str().to_owned(),
            subject,
        }
    }
}
