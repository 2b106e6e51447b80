use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use seatkeeper_core::AppResult;
use seatkeeper_domain::{
    AccessDecision, OperationDefinition, PermissionRule, PermissionSchema, Resource, SubjectId,
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default traversal depth before a branch is treated as not granted.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Edge lookups the evaluator needs from a relationship store.
#[async_trait]
pub trait RelationshipReader: Send + Sync {
    /// Returns whether a direct edge `(resource, relation, subject)` exists.
    async fn has_relationship(
        &self,
        resource: &Resource,
        relation: &str,
        subject: &SubjectId,
    ) -> AppResult<bool>;

    /// Lists object subjects reached from `resource` through `relation`.
    async fn object_subjects(&self, resource: &Resource, relation: &str)
    -> AppResult<Vec<Resource>>;
}

#[derive(Debug, Clone, Default)]
struct TraversalPath {
    depth: usize,
    visited: HashSet<(Resource, String)>,
}

impl TraversalPath {
    fn enter(&self, node: (Resource, String)) -> Self {
        let mut visited = self.visited.clone();
        visited.insert(node);

        Self {
            depth: self.depth + 1,
            visited,
        }
    }
}

/// Evaluates operations against a [`PermissionSchema`].
#[derive(Debug, Clone)]
pub struct PermissionGraph {
    schema: Arc<PermissionSchema>,
    max_depth: usize,
}

impl PermissionGraph {
    /// Creates an evaluator with the default depth limit.
    #[must_use]
    pub fn new(schema: Arc<PermissionSchema>) -> Self {
        Self {
            schema,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Overrides the traversal depth limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Decides whether `subject` may perform `operation` on `resource`.
    pub async fn check<R>(
        &self,
        reader: &R,
        subject: &SubjectId,
        operation: &str,
        resource: &Resource,
    ) -> AppResult<AccessDecision>
    where
        R: RelationshipReader + ?Sized,
    {
        if subject.is_anonymous() {
            return Ok(AccessDecision::Denied);
        }

        let granted = self
            .evaluate(reader, subject, operation, resource, TraversalPath::default())
            .await?;

        Ok(AccessDecision::from(granted))
    }

    fn evaluate<'a, R>(
        &'a self,
        reader: &'a R,
        subject: &'a SubjectId,
        operation: &'a str,
        resource: &'a Resource,
        path: TraversalPath,
    ) -> BoxFuture<'a, AppResult<bool>>
    where
        R: RelationshipReader + ?Sized,
    {
        Box::pin(async move {
            let Some(definition) = self.schema.resolve(&resource.resource_type, operation) else {
                return Ok(false);
            };

            let rules = match definition {
                OperationDefinition::DirectRelation(relation) => {
                    return reader.has_relationship(resource, relation, subject).await;
                }
                OperationDefinition::Rules(rules) => rules,
            };

            if path.depth >= self.max_depth {
                tracing::warn!(
                    resource = %resource,
                    operation,
                    max_depth = self.max_depth,
                    "permission traversal exceeded depth limit"
                );
                return Ok(false);
            }

            let node = (resource.clone(), operation.to_owned());
            if path.visited.contains(&node) {
                return Ok(false);
            }
            let path = path.enter(node);

            for rule in rules {
                let granted = match rule {
                    PermissionRule::Relation { name } => {
                        reader.has_relationship(resource, name, subject).await?
                    }
                    PermissionRule::Permission { name } => {
                        self.evaluate(reader, subject, name, resource, path.clone())
                            .await?
                    }
                    PermissionRule::Arrow {
                        tupleset,
                        permission,
                    } => {
                        let mut granted = false;
                        for object in reader.object_subjects(resource, tupleset).await? {
                            if self
                                .evaluate(reader, subject, permission, &object, path.clone())
                                .await?
                            {
                                granted = true;
                                break;
                            }
                        }
                        granted
                    }
                };

                if granted {
                    return Ok(true);
                }
            }

            Ok(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use seatkeeper_core::AppResult;
    use seatkeeper_domain::{
        AccessDecision, PermissionSchema, Relationship, RelationshipSubject, Resource, SubjectId,
    };

    use super::{PermissionGraph, RelationshipReader};

    #[derive(Default)]
    struct FakeReader {
        edges: HashSet<Relationship>,
    }

    impl FakeReader {
        fn with(mut self, resource: Resource, relation: &str, subject: RelationshipSubject) -> Self {
            self.edges.insert(Relationship {
                resource,
                relation: relation.to_owned(),
                subject,
            });
            self
        }
    }

    #[async_trait]
    impl RelationshipReader for FakeReader {
        async fn has_relationship(
            &self,
            resource: &Resource,
            relation: &str,
            subject: &SubjectId,
        ) -> AppResult<bool> {
            Ok(self.edges.contains(&Relationship {
                resource: resource.clone(),
                relation: relation.to_owned(),
                subject: RelationshipSubject::principal(subject.clone()),
            }))
        }

        async fn object_subjects(
            &self,
            resource: &Resource,
            relation: &str,
        ) -> AppResult<Vec<Resource>> {
            Ok(self
                .edges
                .iter()
                .filter(|edge| &edge.resource == resource && edge.relation == relation)
                .filter_map(|edge| edge.subject.as_object().cloned())
                .collect())
        }
    }

    fn license() -> Resource {
        Resource::new("license", "o1/smarts")
    }

    fn seeded_reader() -> FakeReader {
        FakeReader::default()
            .with(license(), "assigned", RelationshipSubject::principal("u1"))
            .with(license(), "org", RelationshipSubject::object(Resource::org("o1")))
            .with(
                Resource::org("o1"),
                "admin",
                RelationshipSubject::principal("orgadmin"),
            )
            .with(license(), "admin", RelationshipSubject::principal("licadmin"))
    }

    async fn decide(graph: &PermissionGraph, reader: &FakeReader, subject: &str, operation: &str) -> AccessDecision {
        graph
            .check(reader, &SubjectId::from(subject), operation, &license())
            .await
            .unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn seat_holder_has_access_only() {
        let graph = PermissionGraph::new(Arc::new(PermissionSchema::builtin()));
        let reader = seeded_reader();

        assert_eq!(decide(&graph, &reader, "u1", "access").await, AccessDecision::Allowed);
        assert_eq!(
            decide(&graph, &reader, "u1", "view-license").await,
            AccessDecision::Denied
        );
        assert_eq!(decide(&graph, &reader, "u2", "access").await, AccessDecision::Denied);
    }

    #[tokio::test]
    async fn org_admin_reaches_license_through_arrow() {
        let graph = PermissionGraph::new(Arc::new(PermissionSchema::builtin()));
        let reader = seeded_reader();

        for operation in ["administer", "view-license", "manage-seats"] {
            assert_eq!(
                decide(&graph, &reader, "orgadmin", operation).await,
                AccessDecision::Allowed
            );
            assert_eq!(
                decide(&graph, &reader, "licadmin", operation).await,
                AccessDecision::Allowed
            );
        }
        assert_eq!(
            decide(&graph, &reader, "orgadmin", "access").await,
            AccessDecision::Denied
        );
    }

    #[tokio::test]
    async fn plain_relation_and_unknown_names_resolve() {
        let graph = PermissionGraph::new(Arc::new(PermissionSchema::builtin()));
        let reader = seeded_reader();

        assert_eq!(
            decide(&graph, &reader, "u1", "assigned").await,
            AccessDecision::Allowed
        );
        assert_eq!(decide(&graph, &reader, "u1", "fly").await, AccessDecision::Denied);

        let unknown_type = graph
            .check(
                &reader,
                &SubjectId::from("u1"),
                "access",
                &Resource::new("spaceship", "s1"),
            )
            .await;
        assert!(matches!(unknown_type, Ok(AccessDecision::Denied)));
    }

    #[tokio::test]
    async fn cyclic_arrows_terminate_as_denied() {
        let schema = PermissionSchema::from_json(
            r#"{
                "namespaces": {
                    "document": {
                        "relations": ["viewer", "parent"],
                        "permissions": {
                            "read": [
                                { "kind": "relation", "name": "viewer" },
                                { "kind": "arrow", "tupleset": "parent", "permission": "read" }
                            ]
                        }
                    }
                }
            }"#,
        )
        .unwrap_or_else(|_| unreachable!());
        let graph = PermissionGraph::new(Arc::new(schema));
        let first = Resource::new("document", "d1");
        let second = Resource::new("document", "d2");
        let reader = FakeReader::default()
            .with(first.clone(), "parent", RelationshipSubject::object(second.clone()))
            .with(second.clone(), "parent", RelationshipSubject::object(first.clone()))
            .with(second.clone(), "viewer", RelationshipSubject::principal("reader"));

        let inherited = graph
            .check(&reader, &SubjectId::from("reader"), "read", &first)
            .await;
        assert!(matches!(inherited, Ok(AccessDecision::Allowed)));

        let stranger = graph
            .check(&reader, &SubjectId::from("stranger"), "read", &first)
            .await;
        assert!(matches!(stranger, Ok(AccessDecision::Denied)));
    }

    #[tokio::test]
    async fn depth_limit_denies_long_chains() {
        let schema = PermissionSchema::from_json(
            r#"{
                "namespaces": {
                    "folder": {
                        "relations": ["viewer", "parent"],
                        "permissions": {
                            "read": [
                                { "kind": "relation", "name": "viewer" },
                                { "kind": "arrow", "tupleset": "parent", "permission": "read" }
                            ]
                        }
                    }
                }
            }"#,
        )
        .unwrap_or_else(|_| unreachable!());

        let mut reader = FakeReader::default();
        for index in 0..5 {
            reader = reader.with(
                Resource::new("folder", format!("f{index}")),
                "parent",
                RelationshipSubject::object(Resource::new("folder", format!("f{}", index + 1))),
            );
        }
        reader = reader.with(
            Resource::new("folder", "f5"),
            "viewer",
            RelationshipSubject::principal("reader"),
        );

        let subject = SubjectId::from("reader");
        let leaf = Resource::new("folder", "f0");

        let deep = PermissionGraph::new(Arc::new(schema.clone()));
        let allowed = deep.check(&reader, &subject, "read", &leaf).await;
        assert!(matches!(allowed, Ok(AccessDecision::Allowed)));

        let shallow = PermissionGraph::new(Arc::new(schema)).with_max_depth(3);
        let denied = shallow.check(&reader, &subject, "read", &leaf).await;
        assert!(matches!(denied, Ok(AccessDecision::Denied)));
    }
}
