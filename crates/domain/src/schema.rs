//! Typed permission schema describing how operations derive from relations.

use std::collections::{BTreeMap, BTreeSet};

use seatkeeper_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

use crate::access::{Operation, ResourceType};
use crate::relationship::Relation;

/// One branch of a permission union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionRule {
    /// Granted by a direct edge with this relation.
    Relation {
        /// Relation name on the same resource.
        name: String,
    },
    /// Granted when another permission on the same resource is granted.
    Permission {
        /// Permission name on the same resource.
        name: String,
    },
    /// Granted when `permission` holds on any object reached through `tupleset`.
    Arrow {
        /// Relation whose object subjects are followed.
        tupleset: String,
        /// Permission evaluated on each followed object.
        permission: String,
    },
}

impl PermissionRule {
    fn relation(relation: Relation) -> Self {
        Self::Relation {
            name: relation.as_str().to_owned(),
        }
    }

    fn permission(operation: Operation) -> Self {
        Self::Permission {
            name: operation.as_str().to_owned(),
        }
    }

    fn arrow(tupleset: Relation, permission: Operation) -> Self {
        Self::Arrow {
            tupleset: tupleset.as_str().to_owned(),
            permission: permission.as_str().to_owned(),
        }
    }
}

/// Relations and permissions of one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDefinition {
    /// Relation names edges may carry.
    #[serde(default)]
    pub relations: BTreeSet<String>,
    /// Permission name to union of rules.
    #[serde(default)]
    pub permissions: BTreeMap<String, Vec<PermissionRule>>,
}

/// How an operation on a resource type is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationDefinition<'a> {
    /// Union of permission rules.
    Rules(&'a [PermissionRule]),
    /// Plain relation check.
    DirectRelation(&'a str),
}

/// Permission schema keyed by resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSchema {
    /// Namespace definitions keyed by resource type name.
    pub namespaces: BTreeMap<String, NamespaceDefinition>,
}

impl PermissionSchema {
    /// Returns the built-in schema for organizations and licenses.
    #[must_use]
    pub fn builtin() -> Self {
        let org = NamespaceDefinition {
            relations: [Relation::Admin, Relation::Member]
                .iter()
                .map(|relation| relation.as_str().to_owned())
                .collect(),
            permissions: BTreeMap::from([
                (
                    Operation::Administer.as_str().to_owned(),
                    vec![PermissionRule::relation(Relation::Admin)],
                ),
                (
                    "member-access".to_owned(),
                    vec![
                        PermissionRule::relation(Relation::Admin),
                        PermissionRule::relation(Relation::Member),
                    ],
                ),
            ]),
        };

        let license = NamespaceDefinition {
            relations: [Relation::Assigned, Relation::Admin, Relation::Org]
                .iter()
                .map(|relation| relation.as_str().to_owned())
                .collect(),
            permissions: BTreeMap::from([
                (
                    Operation::Access.as_str().to_owned(),
                    vec![PermissionRule::relation(Relation::Assigned)],
                ),
                (
                    Operation::Administer.as_str().to_owned(),
                    vec![
                        PermissionRule::relation(Relation::Admin),
                        PermissionRule::arrow(Relation::Org, Operation::Administer),
                    ],
                ),
                (
                    Operation::ViewLicense.as_str().to_owned(),
                    vec![PermissionRule::permission(Operation::Administer)],
                ),
                (
                    Operation::ManageSeats.as_str().to_owned(),
                    vec![PermissionRule::permission(Operation::Administer)],
                ),
            ]),
        };

        Self {
            namespaces: BTreeMap::from([
                (ResourceType::Org.as_str().to_owned(), org),
                (ResourceType::License.as_str().to_owned(), license),
            ]),
        }
    }

    /// Parses and validates a schema from JSON.
    pub fn from_json(value: &str) -> AppResult<Self> {
        let schema: Self = serde_json::from_str(value).map_err(|error| {
            AppError::Validation(format!("invalid permission schema json: {error}"))
        })?;
        schema.validate()?;
        Ok(schema)
    }

    /// Checks that every rule references names declared in its namespace.
    pub fn validate(&self) -> AppResult<()> {
        for (resource_type, namespace) in &self.namespaces {
            for (permission, rules) in &namespace.permissions {
                if namespace.relations.contains(permission) {
                    return Err(AppError::Validation(format!(
                        "'{resource_type}#{permission}' is declared as both relation and permission"
                    )));
                }

                if rules.is_empty() {
                    return Err(AppError::Validation(format!(
                        "permission '{resource_type}#{permission}' must have at least one rule"
                    )));
                }

                for rule in rules {
                    let (name, declared) = match rule {
                        PermissionRule::Relation { name } => {
                            (name, namespace.relations.contains(name))
                        }
                        PermissionRule::Permission { name } => {
                            (name, namespace.permissions.contains_key(name))
                        }
                        PermissionRule::Arrow { tupleset, .. } => {
                            (tupleset, namespace.relations.contains(tupleset))
                        }
                    };

                    if !declared {
                        return Err(AppError::Validation(format!(
                            "permission '{resource_type}#{permission}' references undeclared name '{name}'"
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Resolves how an operation is evaluated, or `None` when unknown.
    #[must_use]
    pub fn resolve(&self, resource_type: &str, operation: &str) -> Option<OperationDefinition<'_>> {
        let namespace = self.namespaces.get(resource_type)?;

        if let Some(rules) = namespace.permissions.get(operation) {
            return Some(OperationDefinition::Rules(rules.as_slice()));
        }

        namespace
            .relations
            .get(operation)
            .map(|relation| OperationDefinition::DirectRelation(relation.as_str()))
    }
}

impl Default for PermissionSchema {
    fn default() -> Self {
        Self::builtin()
    }
}
