//! Resource definition: model + fields + actions + collection/member sub-routes.
//! Built once through [`ResourceBuilder`], immutable afterwards.

use crate::error::ConfigError;
use crate::model::{ModelHandle, Record};
use crate::resource::action::{ActionTable, DeclareActions};
use crate::resource::field::{FieldDescriptor, FieldSet};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Named collection or member route with its own action overrides.
#[derive(Clone, Debug, Default)]
pub struct SubRoute {
    name: String,
    actions: ActionTable,
}

impl SubRoute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }
}

pub struct SubRouteBuilder {
    route: SubRoute,
}

impl SubRouteBuilder {
    fn new(name: &str) -> Self {
        SubRouteBuilder {
            route: SubRoute {
                name: name.to_string(),
                actions: ActionTable::default(),
            },
        }
    }
}

impl DeclareActions for SubRouteBuilder {
    fn action_table(&mut self) -> &mut ActionTable {
        &mut self.route.actions
    }
}

pub struct ResourceDef {
    name: String,
    model: ModelHandle,
    fields: FieldSet,
    actions: ActionTable,
    collections: HashMap<String, SubRoute>,
    members: HashMap<String, SubRoute>,
}

impl ResourceDef {
    pub fn builder(name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder {
            name: name.into(),
            model: None,
            fields: FieldSet::new(),
            actions: ActionTable::default(),
            collections: HashMap::new(),
            members: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn actions(&self) -> &ActionTable {
        &self.actions
    }

    pub fn collection(&self, name: &str) -> Option<&SubRoute> {
        self.collections.get(name)
    }

    pub fn member(&self, name: &str) -> Option<&SubRoute> {
        self.members.get(name)
    }
}

impl fmt::Debug for ResourceDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDef")
            .field("name", &self.name)
            .field("model", &self.model.name())
            .field("fields", &self.fields)
            .field("actions", &self.actions)
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}

pub struct ResourceBuilder {
    name: String,
    model: Option<ModelHandle>,
    fields: FieldSet,
    actions: ActionTable,
    collections: HashMap<String, SubRoute>,
    members: HashMap<String, SubRoute>,
}

impl ResourceBuilder {
    pub fn model(mut self, model: ModelHandle) -> Self {
        self.model = Some(model);
        self
    }

    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor::attribute(name));
        self
    }

    /// Virtual attribute rendered by `compute`.
    pub fn computed<F>(mut self, name: impl Into<String>, compute: F) -> Self
    where
        F: Fn(&Record) -> Value + Send + Sync + 'static,
    {
        self.fields.push(FieldDescriptor::computed(name, compute));
        self
    }

    pub fn has_many(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor::association(name, None));
        self
    }

    /// `has_many` rendered with an explicitly named resource.
    pub fn has_many_as(mut self, name: impl Into<String>, resource: impl Into<String>) -> Self {
        self.fields
            .push(FieldDescriptor::association(name, Some(resource.into())));
        self
    }

    pub fn has_one(mut self, name: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor::connection(name, None));
        self
    }

    /// `has_one` rendered with an explicitly named resource (irregular plurals, aliases).
    pub fn has_one_as(mut self, name: impl Into<String>, resource: impl Into<String>) -> Self {
        self.fields
            .push(FieldDescriptor::connection(name, Some(resource.into())));
        self
    }

    /// Sub-route on the resource as a whole: `/{resource}/{name}`.
    pub fn collection<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(SubRouteBuilder) -> SubRouteBuilder,
    {
        let route = f(SubRouteBuilder::new(name)).route;
        self.collections.insert(name.to_string(), route);
        self
    }

    /// Sub-route on one record: `/{resource}/{id}/{name}`.
    pub fn member<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(SubRouteBuilder) -> SubRouteBuilder,
    {
        let route = f(SubRouteBuilder::new(name)).route;
        self.members.insert(name.to_string(), route);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn fields(&self) -> &FieldSet {
        &self.fields
    }

    pub fn build(self) -> Result<ResourceDef, ConfigError> {
        let model = self
            .model
            .ok_or_else(|| ConfigError::MissingModel(self.name.clone()))?;
        Ok(ResourceDef {
            name: self.name,
            model,
            fields: self.fields,
            actions: self.actions,
            collections: self.collections,
            members: self.members,
        })
    }
}

impl DeclareActions for ResourceBuilder {
    fn action_table(&mut self) -> &mut ActionTable {
        &mut self.actions
    }
}
