//! Raw config types matching `models.json` and `database.json`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_schema() -> String {
    "public".into()
}

fn default_primary_key() -> String {
    "id".into()
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// PostgreSQL type name (e.g. "bigserial", "text", "uuid"). Used for pk inference and bind casts.
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Target rows carry a foreign key to us.
    HasMany,
    /// One target row carries a foreign key to us.
    HasOne,
    /// We carry a foreign key to the target.
    BelongsTo,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelationshipConfig {
    pub name: String,
    pub kind: RelationKind,
    /// Target model name.
    pub model: String,
    pub foreign_key: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    /// Table name; defaults to the model name.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Empty means schemaless (in-memory store accepts any attribute).
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
    #[serde(default)]
    pub relationships: Vec<RelationshipConfig>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        ModelConfig {
            name: name.into(),
            schema: default_schema(),
            table: None,
            primary_key: default_primary_key(),
            columns: Vec::new(),
            validation: HashMap::new(),
            relationships: Vec::new(),
        }
    }

    pub fn table(mut self, schema: impl Into<String>, table: impl Into<String>) -> Self {
        self.schema = schema.into();
        self.table = Some(table.into());
        self
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn column(mut self, name: impl Into<String>, type_: impl Into<String>) -> Self {
        self.columns.push(ColumnConfig {
            name: name.into(),
            type_: Some(type_.into()),
        });
        self
    }

    pub fn rule(mut self, column: impl Into<String>, rule: ValidationRule) -> Self {
        self.validation.insert(column.into(), rule);
        self
    }

    /// Shorthand for a `required` rule.
    pub fn validates_presence_of(mut self, column: impl Into<String>) -> Self {
        self.validation.entry(column.into()).or_default().required = Some(true);
        self
    }

    fn relation(mut self, kind: RelationKind, name: String, model: String, foreign_key: String) -> Self {
        self.relationships.push(RelationshipConfig {
            name,
            kind,
            model,
            foreign_key,
        });
        self
    }

    pub fn has_many(self, name: impl Into<String>, model: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        self.relation(RelationKind::HasMany, name.into(), model.into(), foreign_key.into())
    }

    pub fn has_one(self, name: impl Into<String>, model: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        self.relation(RelationKind::HasOne, name.into(), model.into(), foreign_key.into())
    }

    pub fn belongs_to(self, name: impl Into<String>, model: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        self.relation(RelationKind::BelongsTo, name.into(), model.into(), foreign_key.into())
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }
}

/// All models in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreConfig {
    pub models: Vec<ModelConfig>,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: ModelConfig) -> Self {
        self.models.push(model);
        self
    }
}

/// One environment's entry in `database.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Process settings read from the environment.
#[derive(Clone, Debug)]
pub struct Settings {
    pub environment: String,
    pub bind_addr: String,
    /// Directory holding `models.json` and `database.json`.
    pub config_path: String,
    pub database_url: Option<String>,
    pub body_limit: usize,
}
