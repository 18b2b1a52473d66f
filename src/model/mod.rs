//! Model store interface: records, validation errors and the `Model` trait.
//!
//! The engine only ever talks to storage through [`Model`]. Two implementations ship
//! with the crate: [`MemoryStore`] and [`PgStore`].

mod memory;
mod postgres;
mod validation;

pub use memory::{MemoryModel, MemoryStore};
pub use postgres::{PgModel, PgStore};
pub use validation::validate_attributes;

use crate::config::PkType;
use crate::error::StoreError;
use crate::params::Params;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared handle to a model; cheap to clone into request contexts.
pub type ModelHandle = Arc<dyn Model>;

/// Field -> messages, as returned from a failed create or update.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// `{"field": ["message", ...]}`
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        )
    }
}

/// One row of a model: ordered attributes plus any validation errors from the last save.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    attributes: Map<String, Value>,
    errors: ValidationErrors,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attributes(attributes: Map<String, Value>) -> Self {
        Record {
            attributes,
            errors: ValidationErrors::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String view of an attribute; numbers are rendered in decimal.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.attributes.get(name).and_then(key_string)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Merge params over the current attributes.
    pub fn assign(&mut self, params: &Params) {
        for (k, v) in params.iter() {
            self.attributes.insert(k.clone(), v.clone());
        }
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.attributes
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(attributes: Map<String, Value>) -> Self {
        Record::from_attributes(attributes)
    }
}

/// Scalar JSON value as a lookup key: strings as-is, numbers and bools as text.
pub(crate) fn key_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse a path id for the table's key type. `None` means no row can match.
pub(crate) fn parse_id(id_str: &str, pk_type: &PkType) -> Option<Value> {
    match pk_type {
        PkType::Uuid => uuid::Uuid::parse_str(id_str)
            .ok()
            .map(|u| Value::String(u.to_string())),
        PkType::BigInt | PkType::Int => id_str.parse::<i64>().ok().map(|n| Value::Number(n.into())),
        PkType::Text => Some(Value::String(id_str.to_string())),
    }
}

/// Result of traversing a named relation.
#[derive(Clone, Debug, PartialEq)]
pub enum Relation {
    Many(Vec<Record>),
    One(Option<Record>),
}

#[async_trait]
pub trait Model: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn primary_key(&self) -> &str {
        "id"
    }

    /// Build and persist a record. Validation failures come back on the record, not as `Err`.
    async fn create(&self, params: &Params) -> Result<Record, StoreError>;

    /// `StoreError::NotFound` when no record has this key.
    async fn find(&self, id: &str) -> Result<Record, StoreError>;

    async fn all(&self) -> Result<Vec<Record>, StoreError>;

    /// Insert or update. Returns `false` and fills `record.errors` when validation fails.
    async fn save(&self, record: &mut Record) -> Result<bool, StoreError>;

    async fn update(&self, id: &str, params: &Params) -> Result<Record, StoreError> {
        let mut record = self.find(id).await?;
        record.assign(params);
        self.save(&mut record).await?;
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn relation(&self, record: &Record, name: &str) -> Result<Relation, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assign_merges_params() {
        let mut record = Record::from_attributes(json!({"id": 1, "name": "kolo"}).as_object().unwrap().clone());
        let params: Params = [("name", "ivan"), ("email", "ivan@x.com")].into_iter().collect();
        record.assign(&params);
        assert_eq!(record.get("name"), Some(&json!("ivan")));
        assert_eq!(record.get_str("id").as_deref(), Some("1"));
        assert_eq!(record.attributes().len(), 3);
    }

    #[test]
    fn errors_render_as_field_map() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "can't be blank");
        errors.add("name", "is too short (minimum is 2 characters)");
        assert_eq!(
            errors.to_value(),
            json!({"name": ["can't be blank", "is too short (minimum is 2 characters)"]})
        );
    }
}
