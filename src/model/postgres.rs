//! PostgreSQL model store over sqlx, driven by resolved table config.

use crate::config::{DatabaseConfig, RelationKind, ResolvedModels, ResolvedTable};
use crate::error::{ConfigError, StoreError};
use crate::model::{key_string, parse_id, validate_attributes, Model, ModelHandle, Record, Relation};
use crate::params::Params;
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use std::sync::Arc;

struct Shared {
    pool: PgPool,
    models: ResolvedModels,
}

#[derive(Clone)]
pub struct PgStore {
    shared: Arc<Shared>,
}

impl PgStore {
    pub fn new(pool: PgPool, models: ResolvedModels) -> Self {
        PgStore {
            shared: Arc::new(Shared { pool, models }),
        }
    }

    pub async fn connect(database: &DatabaseConfig, models: ResolvedModels) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(database.max_connections)
            .connect(&database.url)
            .await?;
        tracing::info!(max_connections = database.max_connections, "connected to database");
        Ok(Self::new(pool, models))
    }

    pub fn pool(&self) -> &PgPool {
        &self.shared.pool
    }

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
        Ok(Arc::new(PgModel {
            shared: self.shared.clone(),
            table,
        }))
    }
}

pub struct PgModel {
    shared: Arc<Shared>,
    table: Arc<ResolvedTable>,
}

impl PgModel {
    fn not_found(&self, id: &str) -> StoreError {
        StoreError::NotFound {
            model: self.table.name.clone(),
            id: id.to_string(),
        }
    }

    fn target(&self, name: &str) -> Result<&Arc<ResolvedTable>, StoreError> {
        self.shared
            .models
            .table(name)
            .ok_or_else(|| StoreError::UnknownModel(name.to_string()))
    }

    async fn query_optional(&self, q: &QueryBuf) -> Result<Option<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query.fetch_optional(&self.shared.pool).await?;
        Ok(row.map(|r| Record::from_attributes(row_to_json(&r))))
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query.fetch_all(&self.shared.pool).await?;
        Ok(rows
            .iter()
            .map(|r| Record::from_attributes(row_to_json(r)))
            .collect())
    }
}

#[async_trait]
impl Model for PgModel {
    fn name(&self) -> &str {
        &self.table.name
    }

    fn primary_key(&self) -> &str {
        &self.table.primary_key
    }

    async fn create(&self, params: &Params) -> Result<Record, StoreError> {
        let mut record = Record::new();
        record.assign(params);
        record.attributes_mut().remove(&self.table.primary_key);
        self.save(&mut record).await?;
        Ok(record)
    }

    async fn find(&self, id: &str) -> Result<Record, StoreError> {
        let key = parse_id(id, &self.table.pk_type).ok_or_else(|| self.not_found(id))?;
        self.query_optional(&sql::select_by_id(&self.table, key))
            .await?
            .ok_or_else(|| self.not_found(id))
    }

    async fn all(&self) -> Result<Vec<Record>, StoreError> {
        self.query_many(&sql::select_all(&self.table)).await
    }

    async fn save(&self, record: &mut Record) -> Result<bool, StoreError> {
        let errors = validate_attributes(record.attributes(), &self.table.validation);
        if !errors.is_empty() {
            *record.errors_mut() = errors;
            return Ok(false);
        }
        record.errors_mut().clear();

        let existing_id = record.get_str(&self.table.primary_key);
        let saved = match existing_id {
            Some(id) => {
                let key = parse_id(&id, &self.table.pk_type).ok_or_else(|| self.not_found(&id))?;
                match sql::update(&self.table, key, record.attributes()) {
                    Some(q) => self.query_optional(&q).await?.ok_or_else(|| self.not_found(&id))?,
                    None => self.find(&id).await?,
                }
            }
            None => self
                .query_optional(&sql::insert(&self.table, record.attributes()))
                .await?
                .ok_or(StoreError::Db(sqlx::Error::RowNotFound))?,
        };
        *record = saved;
        Ok(true)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let key = parse_id(id, &self.table.pk_type).ok_or_else(|| self.not_found(id))?;
        self.query_optional(&sql::delete(&self.table, key))
            .await?
            .map(|_| ())
            .ok_or_else(|| self.not_found(id))
    }

    async fn relation(&self, record: &Record, name: &str) -> Result<Relation, StoreError> {
        let spec = self
            .table
            .relation(name)
            .ok_or_else(|| StoreError::UnknownRelation {
                model: self.table.name.clone(),
                relation: name.to_string(),
            })?;
        let target = self.target(&spec.target)?;
        match spec.kind {
            RelationKind::HasMany => {
                let Some(id) = record.get(&self.table.primary_key).cloned() else {
                    return Ok(Relation::Many(Vec::new()));
                };
                let q = sql::select_where_eq(target, &spec.foreign_key, id, None);
                Ok(Relation::Many(self.query_many(&q).await?))
            }
            RelationKind::HasOne => {
                let Some(id) = record.get(&self.table.primary_key).cloned() else {
                    return Ok(Relation::One(None));
                };
                let q = sql::select_where_eq(target, &spec.foreign_key, id, Some(1));
                Ok(Relation::One(self.query_optional(&q).await?))
            }
            RelationKind::BelongsTo => {
                let Some(fk) = record.get(&spec.foreign_key).and_then(key_string) else {
                    return Ok(Relation::One(None));
                };
                let Some(key) = parse_id(&fk, &target.pk_type) else {
                    return Ok(Relation::One(None));
                };
                Ok(Relation::One(self.query_optional(&sql::select_by_id(target, key)).await?))
            }
        }
    }
}

fn row_to_json(row: &PgRow) -> Map<String, Value> {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDateTime>, _>(name) {
        return Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PkType;
    use serde_json::json;

    #[test]
    fn ids_parse_per_key_type() {
        assert_eq!(parse_id("42", &PkType::BigInt), Some(json!(42)));
        assert_eq!(parse_id("abc", &PkType::Int), None);
        assert_eq!(parse_id("abc", &PkType::Text), Some(json!("abc")));
        assert!(parse_id("not-a-uuid", &PkType::Uuid).is_none());
        let u = uuid::Uuid::new_v4().to_string();
        assert_eq!(parse_id(&u, &PkType::Uuid), Some(json!(u)));
    }
}
