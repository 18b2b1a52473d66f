//! Renders records into JSON documents following a resource's field set, recursing
//! into associations and connections through the registry.

use crate::context::Context;
use crate::error::AppError;
use crate::model::{Record, Relation};
use crate::registry::Registry;
use crate::resource::{FieldDescriptor, FieldKind, FieldSet, ResourceDef};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, AppError>> + Send + 'a>>;

/// Association names entered on the current render branch. Each branch works on
/// its own copy, so siblings never see each other's entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisitedPath(Vec<String>);

impl VisitedPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this path extended with `name`; fails when `name` is already on it.
    pub fn enter(&self, name: &str) -> Result<VisitedPath, AppError> {
        if self.contains(name) {
            return Err(AppError::internal(format!(
                "association cycle: {} -> {}",
                self.0.join(" -> "),
                name
            )));
        }
        let mut next = self.clone();
        next.0.push(name.to_string());
        Ok(next)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

pub struct Serializer<'r> {
    scope: &'r Registry,
}

impl<'r> Serializer<'r> {
    /// `scope` is the registry level related resources are looked up in.
    pub fn new(scope: &'r Registry) -> Self {
        Serializer { scope }
    }

    /// Document for whatever the context ended up holding: a list, one record, or `{}`.
    pub async fn render_context(&self, ctx: &Context) -> Result<Value, AppError> {
        let resource = ctx.resource_handle().as_ref();
        let extra = Some(ctx.extra_fields()).filter(|f| !f.is_empty());
        if let Some(records) = ctx.records() {
            return self.render_list(resource, records, extra, &VisitedPath::new()).await;
        }
        match ctx.record() {
            Some(record) => self.render(resource, record, extra, VisitedPath::new()).await,
            None => Ok(Value::Object(Map::new())),
        }
    }

    pub async fn render_list(
        &self,
        resource: &ResourceDef,
        records: &[Record],
        extra: Option<&FieldSet>,
        path: &VisitedPath,
    ) -> Result<Value, AppError> {
        let mut docs = Vec::with_capacity(records.len());
        for record in records {
            docs.push(self.render(resource, record, extra, path.clone()).await?);
        }
        Ok(Value::Array(docs))
    }

    /// One record: the error map when it carries validation errors, otherwise its
    /// declared fields in order followed by `extra`.
    pub fn render<'a>(
        &'a self,
        resource: &'a ResourceDef,
        record: &'a Record,
        extra: Option<&'a FieldSet>,
        path: VisitedPath,
    ) -> RenderFuture<'a> {
        Box::pin(async move {
            if record.has_errors() {
                return Ok(record.errors().to_value());
            }
            let mut doc = Map::new();
            for field in resource.fields().iter().chain(extra.into_iter().flatten()) {
                let value = self.render_field(resource, record, field, &path).await?;
                doc.insert(field.name().to_string(), value);
            }
            Ok(Value::Object(doc))
        })
    }

    async fn render_field(
        &self,
        resource: &ResourceDef,
        record: &Record,
        field: &FieldDescriptor,
        path: &VisitedPath,
    ) -> Result<Value, AppError> {
        match field.kind() {
            FieldKind::Attribute { compute: Some(compute) } => Ok(compute(record)),
            FieldKind::Attribute { compute: None } => {
                Ok(record.get(field.name()).cloned().unwrap_or(Value::Null))
            }
            FieldKind::Association { .. } | FieldKind::Connection { .. } => {
                let path = path.enter(field.name())?;
                let target = self.scope.related(field).ok_or_else(|| {
                    AppError::unexpected(format!(
                        "no resource for {}.{}",
                        resource.name(),
                        field.name()
                    ))
                })?;
                tracing::debug!(from = resource.name(), field = field.name(), to = target.name(), depth = path.depth(), "rendering relation");
                let relation = resource.model().relation(record, field.name()).await?;
                // The declared field decides the shape, whatever the store relation holds.
                match (field.kind(), relation) {
                    (FieldKind::Association { .. }, Relation::Many(records)) => {
                        self.render_list(target, &records, None, &path).await
                    }
                    (FieldKind::Association { .. }, Relation::One(related)) => {
                        let records: Vec<Record> = related.into_iter().collect();
                        self.render_list(target, &records, None, &path).await
                    }
                    (_, Relation::Many(records)) => match records.first() {
                        Some(first) => self.render(target, first, None, path).await,
                        None => Ok(Value::Null),
                    },
                    (_, Relation::One(Some(related))) => self.render(target, &related, None, path).await,
                    (_, Relation::One(None)) => Ok(Value::Null),
                }
            }
        }
    }
}
