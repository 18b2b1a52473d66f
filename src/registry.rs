//! Resource registry: name -> resource definition, with nested namespaces.
//! Built once before serving; read-only and shared by every request.

use crate::error::ConfigError;
use crate::helpers::Helpers;
use crate::inflect::Inflector;
use crate::resource::{FieldDescriptor, ResourceBuilder, ResourceDef};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug)]
pub struct Registry {
    resources: HashMap<String, Arc<ResourceDef>>,
    namespaces: HashMap<String, Registry>,
    inflector: Arc<Inflector>,
    helpers: Helpers,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn resource(&self, name: &str) -> Option<&Arc<ResourceDef>> {
        self.resources.get(name)
    }

    pub fn namespace(&self, name: &str) -> Option<&Registry> {
        self.namespaces.get(name)
    }

    /// Resource an association or connection renders with, looked up in this scope.
    pub fn related(&self, field: &FieldDescriptor) -> Option<&Arc<ResourceDef>> {
        field
            .target_resource(&self.inflector)
            .and_then(|name| self.resources.get(&name))
    }

    pub fn inflector(&self) -> &Inflector {
        &self.inflector
    }

    pub fn helpers(&self) -> &Helpers {
        &self.helpers
    }

    pub fn resource_names(&self) -> impl Iterator<Item = &String> {
        self.resources.keys()
    }
}

/// Resources and namespaces declared at one level.
#[derive(Default)]
pub struct ScopeBuilder {
    resources: Vec<ResourceBuilder>,
    namespaces: Vec<(String, ScopeBuilder)>,
}

impl ScopeBuilder {
    pub fn resource<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(ResourceBuilder) -> ResourceBuilder,
    {
        self.resources.push(f(ResourceDef::builder(name)));
        self
    }

    pub fn namespace<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(ScopeBuilder) -> ScopeBuilder,
    {
        self.namespaces.push((name.to_string(), f(ScopeBuilder::default())));
        self
    }

    fn build(self, inflector: &Arc<Inflector>, helpers: &Helpers) -> Result<Registry, ConfigError> {
        let mut names = HashSet::new();
        for name in self
            .resources
            .iter()
            .map(ResourceBuilder::name)
            .chain(self.namespaces.iter().map(|(n, _)| n.as_str()))
        {
            if !names.insert(name.to_string()) {
                return Err(ConfigError::DuplicatePathSegment(name.to_string()));
            }
        }

        let resource_names: HashSet<&str> = self.resources.iter().map(ResourceBuilder::name).collect();
        for r in &self.resources {
            for field in r.fields() {
                if let Some(target) = field.target_resource(inflector) {
                    if !resource_names.contains(target.as_str()) {
                        return Err(ConfigError::MissingReference {
                            kind: "resource",
                            id: format!("{} (from {}.{})", target, r.name(), field.name()),
                        });
                    }
                }
            }
        }

        let mut resources = HashMap::new();
        for r in self.resources {
            let def = r.build()?;
            resources.insert(def.name().to_string(), Arc::new(def));
        }
        let mut namespaces = HashMap::new();
        for (name, scope) in self.namespaces {
            namespaces.insert(name, scope.build(inflector, helpers)?);
        }

        Ok(Registry {
            resources,
            namespaces,
            inflector: inflector.clone(),
            helpers: helpers.clone(),
        })
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    root: ScopeBuilder,
    inflector: Inflector,
    helpers: Helpers,
}

impl RegistryBuilder {
    pub fn resource<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(ResourceBuilder) -> ResourceBuilder,
    {
        self.root = self.root.resource(name, f);
        self
    }

    /// Namespace segment(s) preceding resources: `/api/v1/books`.
    pub fn namespace<F>(mut self, name: &str, f: F) -> Self
    where
        F: FnOnce(ScopeBuilder) -> ScopeBuilder,
    {
        self.root = self.root.namespace(name, f);
        self
    }

    /// Register an irregular plural used to resolve association targets.
    pub fn irregular(mut self, singular: &str, plural: &str) -> Self {
        self.inflector.irregular(singular, plural);
        self
    }

    pub fn helper<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.helpers.insert(value);
        self
    }

    /// Validate and freeze every declaration.
    pub fn build(self) -> Result<Registry, ConfigError> {
        let inflector = Arc::new(self.inflector);
        let registry = self.root.build(&inflector, &self.helpers)?;
        tracing::debug!(resources = registry.resources.len(), namespaces = registry.namespaces.len(), "registry built");
        Ok(registry)
    }
}
