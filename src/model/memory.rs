//! In-process model store. Thread-safe; every model shares one set of tables so
//! relations can be traversed across models.

use crate::config::{PkType, RelationKind, ResolvedModels, ResolvedTable};
use crate::error::{ConfigError, StoreError};
use crate::model::{key_string, parse_id, validate_attributes, Model, ModelHandle, Record, Relation};
use crate::params::Params;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Table {
    /// Insertion order is listing order.
    rows: BTreeMap<u64, Map<String, Value>>,
    next_seq: u64,
}

struct Shared {
    models: ResolvedModels,
    tables: RwLock<HashMap<String, Table>>,
}

#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new(models: ResolvedModels) -> Self {
        let tables = models
            .tables
            .iter()
            .map(|t| (t.name.clone(), Table::default()))
            .collect();
        MemoryStore {
            shared: Arc::new(Shared {
                models,
                tables: RwLock::new(tables),
            }),
        }
    }

    /// Handle for one model, for binding to a resource.
    pub fn model(&self, name: &str) -> Result<ModelHandle, ConfigError> {
        let table = self
            .shared
            .models
            .table(name)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "model",
                id: name.to_string(),
            })?
            .clone();
        Ok(Arc::new(MemoryModel {
            shared: self.shared.clone(),
            table,
        }))
    }
}

pub struct MemoryModel {
    shared: Arc<Shared>,
    table: Arc<ResolvedTable>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

impl Shared {
    fn spec(&self, model: &str) -> Result<&Arc<ResolvedTable>, StoreError> {
        self.models
            .table(model)
            .ok_or_else(|| StoreError::UnknownModel(model.to_string()))
    }

    fn find_row(&self, model: &str, id: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let spec = self.spec(model)?;
        let Some(key) = normalize_key(id, &spec.pk_type) else {
            return Ok(None);
        };
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.get(model).and_then(|t| {
            t.rows
                .values()
                .find(|row| row.get(&spec.primary_key).and_then(key_string).as_deref() == Some(key.as_str()))
                .cloned()
        }))
    }

    fn rows_where(&self, model: &str, column: &str, key: &str) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables
            .get(model)
            .map(|t| {
                t.rows
                    .values()
                    .filter(|row| row.get(column).and_then(key_string).as_deref() == Some(key))
                    .cloned()
                    .map(Record::from_attributes)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Canonical text of `id` for the key type, so `01` finds the row keyed `1`.
fn normalize_key(id: &str, pk_type: &PkType) -> Option<String> {
    parse_id(id, pk_type).as_ref().and_then(key_string)
}

impl MemoryModel {
    fn not_found(&self, id: &str) -> StoreError {
        StoreError::NotFound {
            model: self.table.name.clone(),
            id: id.to_string(),
        }
    }

    /// Schemaless tables keep every attribute; otherwise only declared columns survive.
    fn retain_columns(&self, attributes: &mut Map<String, Value>) {
        if !self.table.is_schemaless() {
            attributes.retain(|k, _| self.table.column(k).is_some());
        }
    }

    fn generate_key(&self, seq: u64) -> Value {
        match self.table.pk_type {
            PkType::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
            PkType::Text => Value::String(seq.to_string()),
            PkType::BigInt | PkType::Int => Value::Number(seq.into()),
        }
    }
}

#[async_trait]
impl Model for MemoryModel {
    fn name(&self) -> &str {
        &self.table.name
    }

    fn primary_key(&self) -> &str {
        &self.table.primary_key
    }

    async fn create(&self, params: &Params) -> Result<Record, StoreError> {
        let mut record = Record::new();
        record.assign(params);
        // A client-supplied key is not honoured on create.
        record.attributes_mut().remove(&self.table.primary_key);
        self.save(&mut record).await?;
        Ok(record)
    }

    async fn find(&self, id: &str) -> Result<Record, StoreError> {
        self.shared
            .find_row(&self.table.name, id)?
            .map(Record::from_attributes)
            .ok_or_else(|| self.not_found(id))
    }

    async fn all(&self) -> Result<Vec<Record>, StoreError> {
        let tables = self.shared.tables.read().map_err(poisoned)?;
        Ok(tables
            .get(&self.table.name)
            .map(|t| t.rows.values().cloned().map(Record::from_attributes).collect())
            .unwrap_or_default())
    }

    async fn save(&self, record: &mut Record) -> Result<bool, StoreError> {
        let pk = self.table.primary_key.clone();
        self.retain_columns(record.attributes_mut());
        let errors = validate_attributes(record.attributes(), &self.table.validation);
        if !errors.is_empty() {
            *record.errors_mut() = errors;
            return Ok(false);
        }
        record.errors_mut().clear();

        let mut tables = self.shared.tables.write().map_err(poisoned)?;
        let table = tables.entry(self.table.name.clone()).or_default();
        let existing = record
            .get_str(&pk)
            .and_then(|id| normalize_key(&id, &self.table.pk_type))
            .and_then(|key| {
                table
                    .rows
                    .iter()
                    .find(|(_, row)| row.get(&pk).and_then(key_string).as_deref() == Some(key.as_str()))
                    .map(|(seq, _)| *seq)
            });
        match existing {
            Some(seq) => {
                table.rows.insert(seq, record.attributes().clone());
            }
            None => {
                table.next_seq += 1;
                let seq = table.next_seq;
                if record.get(&pk).map_or(true, Value::is_null) {
                    let key = self.generate_key(seq);
                    // Key first, like a table's leading id column.
                    let mut attributes = Map::new();
                    attributes.insert(pk.clone(), key);
                    attributes.extend(std::mem::take(record.attributes_mut()));
                    *record.attributes_mut() = attributes;
                }
                table.rows.insert(seq, record.attributes().clone());
            }
        }
        tracing::debug!(model = %self.table.name, id = ?record.get(&pk), "memory save");
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let pk = &self.table.primary_key;
        let key = normalize_key(id, &self.table.pk_type).ok_or_else(|| self.not_found(id))?;
        let mut tables = self.shared.tables.write().map_err(poisoned)?;
        let table = tables
            .get_mut(&self.table.name)
            .ok_or_else(|| self.not_found(id))?;
        let seq = table
            .rows
            .iter()
            .find(|(_, row)| row.get(pk).and_then(key_string).as_deref() == Some(key.as_str()))
            .map(|(seq, _)| *seq)
            .ok_or_else(|| self.not_found(id))?;
        table.rows.remove(&seq);
        Ok(())
    }

    async fn relation(&self, record: &Record, name: &str) -> Result<Relation, StoreError> {
        let spec = self
            .table
            .relation(name)
            .ok_or_else(|| StoreError::UnknownRelation {
                model: self.table.name.clone(),
                relation: name.to_string(),
            })?;
        match spec.kind {
            RelationKind::HasMany | RelationKind::HasOne => {
                let Some(id) = record.get_str(&self.table.primary_key) else {
                    return Ok(match spec.kind {
                        RelationKind::HasMany => Relation::Many(Vec::new()),
                        _ => Relation::One(None),
                    });
                };
                let rows = self.shared.rows_where(&spec.target, &spec.foreign_key, &id)?;
                Ok(match spec.kind {
                    RelationKind::HasMany => Relation::Many(rows),
                    _ => Relation::One(rows.into_iter().next()),
                })
            }
            RelationKind::BelongsTo => {
                let Some(fk) = record.get_str(&spec.foreign_key) else {
                    return Ok(Relation::One(None));
                };
                let row = self.shared.find_row(&spec.target, &fk)?;
                Ok(Relation::One(row.map(Record::from_attributes)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ModelConfig, StoreConfig};
    use serde_json::json;

    fn store() -> MemoryStore {
        let config = StoreConfig::new()
            .model(
                ModelConfig::new("users")
                    .validates_presence_of("name")
                    .has_many("books", "books", "user_id"),
            )
            .model(ModelConfig::new("books").belongs_to("user", "users", "user_id"));
        MemoryStore::new(resolve(&config).unwrap())
    }

    #[tokio::test]
    async fn create_assigns_sequential_keys() {
        let users = store().model("users").unwrap();
        let params: Params = [("name", "kolo"), ("email", "kolo@x.com")].into_iter().collect();
        let first = users.create(&params).await.unwrap();
        let second = users.create(&params).await.unwrap();
        assert_eq!(first.get("id"), Some(&json!(1)));
        assert_eq!(second.get("id"), Some(&json!(2)));
        assert_eq!(first.attributes().keys().next().map(String::as_str), Some("id"));
        assert_eq!(users.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_create_is_not_persisted() {
        let users = store().model("users").unwrap();
        let params: Params = [("email", "kolo@x.com")].into_iter().collect();
        let record = users.create(&params).await.unwrap();
        assert!(record.has_errors());
        assert!(record.get("id").is_none());
        assert!(users.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_by_key() {
        let users = store().model("users").unwrap();
        let created = users
            .create(&[("name", "kolo")].into_iter().collect())
            .await
            .unwrap();
        let id = created.get_str("id").unwrap();
        let updated = users
            .update(&id, &[("name", "ivan")].into_iter().collect())
            .await
            .unwrap();
        assert_eq!(updated.get("name"), Some(&json!("ivan")));
        assert_eq!(users.find(&id).await.unwrap().get("name"), Some(&json!("ivan")));

        users.delete(&id).await.unwrap();
        assert!(matches!(users.find(&id).await, Err(StoreError::NotFound { .. })));
        assert!(matches!(users.delete(&id).await, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn relations_follow_foreign_keys() {
        let store = store();
        let users = store.model("users").unwrap();
        let books = store.model("books").unwrap();
        let user = users.create(&[("name", "kolo")].into_iter().collect()).await.unwrap();
        let uid = user.get_str("id").unwrap();
        for isbn in ["abc", "def"] {
            books
                .create(&[("isbn", isbn), ("user_id", uid.as_str())].into_iter().collect())
                .await
                .unwrap();
        }

        match users.relation(&user, "books").await.unwrap() {
            Relation::Many(rows) => assert_eq!(rows.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
        let book = books.find("1").await.unwrap();
        match books.relation(&book, "user").await.unwrap() {
            Relation::One(Some(owner)) => assert_eq!(owner.get("name"), Some(&json!("kolo"))),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            users.relation(&user, "reviews").await,
            Err(StoreError::UnknownRelation { .. })
        ));
    }

    #[tokio::test]
    async fn numeric_keys_match_in_canonical_form() {
        let users = store().model("users").unwrap();
        users.create(&[("name", "kolo")].into_iter().collect()).await.unwrap();

        assert_eq!(users.find("01").await.unwrap().get("id"), Some(&json!(1)));
        assert_eq!(users.find("+1").await.unwrap().get("id"), Some(&json!(1)));
        assert!(matches!(users.find("one").await, Err(StoreError::NotFound { .. })));

        let updated = users
            .update("001", &[("name", "ivan")].into_iter().collect())
            .await
            .unwrap();
        assert_eq!(updated.get("name"), Some(&json!("ivan")));
        assert_eq!(users.all().await.unwrap().len(), 1);

        users.delete("01").await.unwrap();
        assert!(users.all().await.unwrap().is_empty());
    }
}
