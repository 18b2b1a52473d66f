//! Field descriptors: which attributes, associations and connections a resource exposes.

use crate::inflect::Inflector;
use crate::model::Record;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Projection for a computed attribute.
pub type ComputeFn = Arc<dyn Fn(&Record) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum FieldKind {
    /// Plain attribute read off the record, or a projection when `compute` is set.
    Attribute { compute: Option<ComputeFn> },
    /// One-to-many (`has_many`). `resource` overrides the pluralized field name.
    Association { resource: Option<String> },
    /// One-to-one (`has_one`). `has_one :author` resolves resource `authors` unless overridden.
    Connection { resource: Option<String> },
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Attribute { compute } => f
                .debug_struct("Attribute")
                .field("computed", &compute.is_some())
                .finish(),
            FieldKind::Association { resource } => {
                f.debug_struct("Association").field("resource", resource).finish()
            }
            FieldKind::Connection { resource } => {
                f.debug_struct("Connection").field("resource", resource).finish()
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
}

impl FieldDescriptor {
    pub fn attribute(name: impl Into<String>) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind: FieldKind::Attribute { compute: None },
        }
    }

    pub fn computed<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        FieldDescriptor {
            name: name.into(),
            kind: FieldKind::Attribute {
                compute: Some(Arc::new(compute)),
            },
        }
    }

    pub fn association(name: impl Into<String>, resource: Option<String>) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind: FieldKind::Association { resource },
        }
    }

    pub fn connection(name: impl Into<String>, resource: Option<String>) -> Self {
        FieldDescriptor {
            name: name.into(),
            kind: FieldKind::Connection { resource },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Resource name an association or connection renders with; `None` for attributes.
    pub fn target_resource(&self, inflector: &Inflector) -> Option<String> {
        match &self.kind {
            FieldKind::Attribute { .. } => None,
            FieldKind::Association { resource } | FieldKind::Connection { resource } => Some(
                resource
                    .clone()
                    .unwrap_or_else(|| inflector.pluralize(&self.name)),
            ),
        }
    }
}

/// Ordered descriptor set. Redeclaring a name replaces the earlier descriptor in place.
#[derive(Clone, Debug, Default)]
pub struct FieldSet {
    fields: Vec<FieldDescriptor>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: FieldDescriptor) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redeclaring_keeps_position() {
        let mut fields = FieldSet::new();
        fields.push(FieldDescriptor::attribute("id"));
        fields.push(FieldDescriptor::attribute("name"));
        fields.push(FieldDescriptor::computed("id", |_| json!("x")));
        let names: Vec<&str> = fields.iter().map(FieldDescriptor::name).collect();
        assert_eq!(names, ["id", "name"]);
        assert!(matches!(
            fields.get("id").unwrap().kind(),
            FieldKind::Attribute { compute: Some(_) }
        ));
    }

    #[test]
    fn targets_follow_naming_rule() {
        let inflector = Inflector::new();
        assert_eq!(
            FieldDescriptor::connection("user", None).target_resource(&inflector).as_deref(),
            Some("users")
        );
        assert_eq!(
            FieldDescriptor::association("books", None).target_resource(&inflector).as_deref(),
            Some("books")
        );
        assert_eq!(
            FieldDescriptor::connection("owner", Some("users".into()))
                .target_resource(&inflector)
                .as_deref(),
            Some("users")
        );
        assert!(FieldDescriptor::attribute("name").target_resource(&inflector).is_none());
    }
}
