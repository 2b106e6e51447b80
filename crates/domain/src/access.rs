use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::license::LicenseKey;
use crate::subject::SubjectId;

/// Resource types known to the built-in permission schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Capacity record for one organization and service.
    License,
    /// Organization owning licenses and members.
    Org,
}

impl ResourceType {
    /// Returns the stable type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::License => "license",
            Self::Org => "org",
        }
    }
}

/// Operations the services ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Use of a licensed service, granted by holding a seat.
    Access,
    /// Reading seat counts and assignments.
    ViewLicense,
    /// Assigning and unassigning seats.
    ManageSeats,
    /// Administrative control, required for delegated checks.
    Administer,
}

impl Operation {
    /// Returns the stable operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::ViewLicense => "view-license",
            Self::ManageSeats => "manage-seats",
            Self::Administer => "administer",
        }
    }
}

/// A protected object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    /// Resource type name.
    pub resource_type: String,
    /// Resource identifier within its type.
    pub id: String,
}

impl Resource {
    /// Creates a resource reference.
    #[must_use]
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Returns the license resource for an organization and service.
    #[must_use]
    pub fn license(key: &LicenseKey) -> Self {
        Self::new(ResourceType::License.as_str(), key.resource_id())
    }

    /// Returns the organization resource.
    #[must_use]
    pub fn org(org_id: impl Into<String>) -> Self {
        Self::new(ResourceType::Org.as_str(), org_id)
    }

    /// Returns whether the resource has the given type.
    #[must_use]
    pub fn is_type(&self, resource_type: ResourceType) -> bool {
        self.resource_type == resource_type.as_str()
    }
}

impl Display for Resource {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.resource_type, self.id)
    }
}

/// Binary outcome of a permission question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessDecision {
    /// The operation is permitted.
    Allowed,
    /// The operation is not permitted.
    Denied,
}

impl AccessDecision {
    /// Returns whether the decision permits the operation.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

impl From<bool> for AccessDecision {
    fn from(value: bool) -> Self {
        if value { Self::Allowed } else { Self::Denied }
    }
}

/// One authorization question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckEvent {
    /// Caller asking the question.
    pub requestor: SubjectId,
    /// Subject whose access is evaluated.
    pub subject_id: SubjectId,
    /// Operation name.
    pub operation: String,
    /// Resource the operation targets.
    pub resource: Resource,
}

impl CheckEvent {
    /// Creates a check where the requestor asks about their own access.
    #[must_use]
    pub fn for_self(requestor: SubjectId, operation: Operation, resource: Resource) -> Self {
        Self {
            subject_id: requestor.clone(),
            requestor,
            operation: operation.as_str().to_owned(),
            resource,
        }
    }

    /// Returns whether the requestor asks about someone else.
    #[must_use]
    pub fn is_delegated(&self) -> bool {
        self.requestor != self.subject_id
    }
}
