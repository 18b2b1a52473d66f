//! Path state machine: consumes `/`-separated segments left to right against the
//! registry and resolves the resource, id, record and sub-route a request targets.
//! Greedy, no backtracking; every segment must match or the request fails.

use crate::error::AppError;
use crate::model::Record;
use crate::registry::Registry;
use crate::resource::{ActionTable, ResourceDef, SubRoute};
use std::sync::Arc;

/// What the path ended on.
#[derive(Debug)]
pub enum Target<'r> {
    /// `/{resource}` or `/{resource}/{id}`.
    Resource,
    /// `/{resource}/{collection}`.
    Collection(&'r SubRoute),
    /// `/{resource}/{id}/{member}`.
    Member(&'r SubRoute),
}

#[derive(Debug)]
pub struct Route<'r> {
    /// Registry level the resource was found in; associations resolve here.
    pub scope: &'r Registry,
    pub resource: Arc<ResourceDef>,
    pub id: Option<String>,
    pub record: Option<Record>,
    pub target: Target<'r>,
}

impl<'r> Route<'r> {
    /// Action table that serves this route: the sub-route's own table when one matched.
    pub fn actions(&self) -> &ActionTable {
        match &self.target {
            Target::Resource => self.resource.actions(),
            Target::Collection(sub) | Target::Member(sub) => sub.actions(),
        }
    }

    pub fn collection_name(&self) -> Option<&str> {
        match &self.target {
            Target::Collection(sub) => Some(sub.name()),
            _ => None,
        }
    }

    pub fn member_name(&self) -> Option<&str> {
        match &self.target {
            Target::Member(sub) => Some(sub.name()),
            _ => None,
        }
    }
}

enum State<'r> {
    AwaitResource {
        scope: &'r Registry,
    },
    AwaitIdOrCollection {
        scope: &'r Registry,
        resource: &'r Arc<ResourceDef>,
    },
    AwaitMember {
        scope: &'r Registry,
        resource: &'r Arc<ResourceDef>,
        id: String,
        record: Record,
    },
    Resolved(Route<'r>),
}

pub struct PathRouter<'r> {
    registry: &'r Registry,
}

impl<'r> PathRouter<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        PathRouter { registry }
    }

    /// Resolve `path`. Loads the record eagerly when an id segment is consumed,
    /// so a missing record fails here with `NotFound`.
    pub async fn resolve(&self, path: &str) -> Result<Route<'r>, AppError> {
        let mut state = State::AwaitResource {
            scope: self.registry,
        };

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            state = match state {
                State::AwaitResource { scope } => {
                    if let Some(resource) = scope.resource(segment) {
                        tracing::debug!(resource = segment, "resource matched");
                        State::AwaitIdOrCollection { scope, resource }
                    } else if let Some(namespace) = scope.namespace(segment) {
                        tracing::debug!(namespace = segment, "entering namespace");
                        State::AwaitResource { scope: namespace }
                    } else {
                        return Err(AppError::bad_request(format!(
                            "unknown resource '{}'",
                            segment
                        )));
                    }
                }
                State::AwaitIdOrCollection { scope, resource } => {
                    if let Some(sub) = resource.collection(segment) {
                        tracing::debug!(resource = resource.name(), collection = segment, "collection matched");
                        State::Resolved(Route {
                            scope,
                            resource: resource.clone(),
                            id: None,
                            record: None,
                            target: Target::Collection(sub),
                        })
                    } else {
                        let record = resource.model().find(segment).await?;
                        tracing::debug!(resource = resource.name(), id = segment, "record resolved");
                        State::AwaitMember {
                            scope,
                            resource,
                            id: segment.to_string(),
                            record,
                        }
                    }
                }
                State::AwaitMember {
                    scope,
                    resource,
                    id,
                    record,
                } => match resource.member(segment) {
                    Some(sub) => {
                        tracing::debug!(resource = resource.name(), member = segment, "member matched");
                        State::Resolved(Route {
                            scope,
                            resource: resource.clone(),
                            id: Some(id),
                            record: Some(record),
                            target: Target::Member(sub),
                        })
                    }
                    None => {
                        return Err(AppError::bad_request(format!(
                            "unknown member '{}' on {}",
                            segment,
                            resource.name()
                        )))
                    }
                },
                State::Resolved(route) => {
                    return Err(AppError::bad_request(format!(
                        "unexpected segment '{}' after {}",
                        segment,
                        route.resource.name()
                    )))
                }
            };
        }

        match state {
            State::AwaitResource { .. } => Err(AppError::bad_request("no resource in path")),
            State::AwaitIdOrCollection { scope, resource } => Ok(Route {
                scope,
                resource: resource.clone(),
                id: None,
                record: None,
                target: Target::Resource,
            }),
            State::AwaitMember {
                scope,
                resource,
                id,
                record,
            } => Ok(Route {
                scope,
                resource: resource.clone(),
                id: Some(id),
                record: Some(record),
                target: Target::Resource,
            }),
            State::Resolved(route) => Ok(route),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ModelConfig, StoreConfig};
    use crate::error::ErrorKind;
    use crate::model::MemoryStore;
    use crate::params::Params;
    use crate::resource::{Action, DeclareActions};

    async fn fixture() -> (MemoryStore, Registry) {
        let config = StoreConfig::new().model(
            ModelConfig::new("users")
                .column("id", "bigint")
                .column("name", "text"),
        );
        let store = MemoryStore::new(resolve(&config).unwrap());
        let users = store.model("users").unwrap();
        let params: Params = [("name", "kolo")].into_iter().collect();
        users.create(&params).await.unwrap();

        let registry = Registry::builder()
            .resource("users", |r| {
                r.model(users.clone())
                    .attribute("name")
                    .action(Action::Show)
                    .collection("admin", |c| c.action(Action::Show))
                    .member("blurred", |m| m.action(Action::Show))
            })
            .namespace("api", |api| {
                api.namespace("v1", |v1| v1.resource("users", |r| r.model(users.clone())))
            })
            .build()
            .unwrap();
        (store, registry)
    }

    #[tokio::test]
    async fn resolves_plain_resource() {
        let (_store, registry) = fixture().await;
        let route = PathRouter::new(&registry).resolve("/users").await.unwrap();
        assert_eq!(route.resource.name(), "users");
        assert!(route.id.is_none());
        assert!(matches!(route.target, Target::Resource));
    }

    #[tokio::test]
    async fn id_segment_loads_record() {
        let (_store, registry) = fixture().await;
        let route = PathRouter::new(&registry).resolve("/users/1").await.unwrap();
        assert_eq!(route.id.as_deref(), Some("1"));
        assert_eq!(route.record.unwrap().get_str("name").as_deref(), Some("kolo"));
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let (_store, registry) = fixture().await;
        let err = PathRouter::new(&registry).resolve("/users/42").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn collection_and_member_routes() {
        let (_store, registry) = fixture().await;
        let router = PathRouter::new(&registry);

        let route = router.resolve("/users/admin").await.unwrap();
        assert_eq!(route.collection_name(), Some("admin"));
        assert!(route.record.is_none());

        let route = router.resolve("/users/1/blurred").await.unwrap();
        assert_eq!(route.member_name(), Some("blurred"));
        assert_eq!(route.id.as_deref(), Some("1"));
        assert!(route.actions().contains(Action::Show));
    }

    #[tokio::test]
    async fn nested_namespace_reaches_resource() {
        let (_store, registry) = fixture().await;
        let route = PathRouter::new(&registry).resolve("/api/v1/users/1").await.unwrap();
        assert_eq!(route.resource.name(), "users");
        assert!(std::ptr::eq(
            route.scope,
            registry.namespace("api").unwrap().namespace("v1").unwrap()
        ));
    }

    #[tokio::test]
    async fn unknown_segments_are_bad_requests() {
        let (_store, registry) = fixture().await;
        let router = PathRouter::new(&registry);
        for path in ["/", "/nope", "/api/nope", "/users/1/nope", "/users/admin/extra", "/users/1/blurred/x"] {
            let err = router.resolve(path).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadRequest, "path {}", path);
        }
    }
}
