//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod access;
mod license;
mod relationship;
mod schema;
mod subject;

pub use access::{AccessDecision, CheckEvent, Operation, Resource, ResourceType};
pub use license::{License, LicenseKey, Service};
pub use relationship::{Relation, Relationship, RelationshipSubject};
pub use schema::{NamespaceDefinition, OperationDefinition, PermissionRule, PermissionSchema};
pub use subject::{Principal, Subject, SubjectId};
