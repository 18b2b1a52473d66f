//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved table.

use crate::config::ResolvedTable;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(table: &ResolvedTable) -> String {
    format!("{}.{}", quoted(&table.schema_name), quoted(&table.table_name))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a bind value and return its placeholder, cast to the column type when known.
    fn push_param(&mut self, table: &ResolvedTable, column: &str, v: Value) -> String {
        self.params.push(v);
        let n = self.params.len();
        match table.column(column).and_then(|c| c.pg_type.as_deref()) {
            Some(ty) => format!("${}::{}", n, ty),
            None => format!("${}", n),
        }
    }
}

/// Explicit column list when the table is typed, `*` otherwise.
fn select_column_list(table: &ResolvedTable) -> String {
    if table.is_schemaless() {
        return "*".into();
    }
    table
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Attributes that map to writable columns (pk excluded unless `include_pk`).
fn writable<'a>(
    table: &'a ResolvedTable,
    attributes: &'a Map<String, Value>,
    include_pk: bool,
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    attributes.iter().filter(move |(k, _)| {
        (include_pk || **k != table.primary_key) && (table.is_schemaless() || table.column(k).is_some())
    })
}

pub fn select_by_id(table: &ResolvedTable, id: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let placeholder = q.push_param(table, &table.primary_key, id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(table),
        qualified_table(table),
        quoted(&table.primary_key),
        placeholder
    );
    q
}

pub fn select_all(table: &ResolvedTable) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(table),
        qualified_table(table),
        quoted(&table.primary_key)
    );
    q
}

/// Rows whose `column` equals `value`, in key order. Used for relation traversal.
pub fn select_where_eq(table: &ResolvedTable, column: &str, value: Value, limit: Option<u32>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let placeholder = q.push_param(table, column, value);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} ORDER BY {}",
        select_column_list(table),
        qualified_table(table),
        quoted(column),
        placeholder,
        quoted(&table.primary_key)
    );
    if let Some(n) = limit {
        q.sql.push_str(&format!(" LIMIT {}", n));
    }
    q
}

pub fn insert(table: &ResolvedTable, attributes: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for (k, v) in writable(table, attributes, true) {
        cols.push(quoted(k));
        placeholders.push(q.push_param(table, k, v.clone()));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            qualified_table(table),
            select_column_list(table)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(table),
            cols.join(", "),
            placeholders.join(", "),
            select_column_list(table)
        )
    };
    q
}

/// UPDATE by primary key. `None` when there is nothing to set.
pub fn update(table: &ResolvedTable, id: Value, attributes: &Map<String, Value>) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in writable(table, attributes, false) {
        let placeholder = q.push_param(table, k, v.clone());
        sets.push(format!("{} = {}", quoted(k), placeholder));
    }
    if sets.is_empty() {
        return None;
    }
    let pk_placeholder = q.push_param(table, &table.primary_key, id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        sets.join(", "),
        quoted(&table.primary_key),
        pk_placeholder,
        select_column_list(table)
    );
    Some(q)
}

pub fn delete(table: &ResolvedTable, id: Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let placeholder = q.push_param(table, &table.primary_key, id);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(table),
        quoted(&table.primary_key),
        placeholder,
        quoted(&table.primary_key)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ModelConfig, StoreConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn users() -> Arc<ResolvedTable> {
        let config = StoreConfig::new().model(
            ModelConfig::new("users")
                .table("app", "users")
                .column("id", "bigserial")
                .column("name", "text")
                .column("email", "text"),
        );
        resolve(&config).unwrap().table("users").unwrap().clone()
    }

    #[test]
    fn select_by_id_casts_key() {
        let q = select_by_id(&users(), json!("5"));
        assert_eq!(
            q.sql,
            r#"SELECT "id", "name", "email" FROM "app"."users" WHERE "id" = $1::bigint"#
        );
        assert_eq!(q.params, vec![json!("5")]);
    }

    #[test]
    fn insert_skips_unknown_columns() {
        let attrs = json!({"name": "kolo", "role": "admin"}).as_object().cloned().unwrap();
        let q = insert(&users(), &attrs);
        assert_eq!(
            q.sql,
            r#"INSERT INTO "app"."users" ("name") VALUES ($1::text) RETURNING "id", "name", "email""#
        );
        assert_eq!(q.params, vec![json!("kolo")]);
    }

    #[test]
    fn update_never_sets_primary_key() {
        let attrs = json!({"id": 5, "name": "ivan"}).as_object().cloned().unwrap();
        let q = update(&users(), json!(5), &attrs).unwrap();
        assert_eq!(
            q.sql,
            r#"UPDATE "app"."users" SET "name" = $1::text WHERE "id" = $2::bigint RETURNING "id", "name", "email""#
        );
        assert!(update(&users(), json!(5), &json!({"id": 5}).as_object().cloned().unwrap()).is_none());
    }

    #[test]
    fn relation_lookup_orders_and_limits() {
        let config = StoreConfig::new().model(ModelConfig::new("books"));
        let books = resolve(&config).unwrap().table("books").unwrap().clone();
        let q = select_where_eq(&books, "user_id", json!(1), Some(1));
        assert_eq!(
            q.sql,
            r#"SELECT * FROM "public"."books" WHERE "user_id" = $1 ORDER BY "id" LIMIT 1"#
        );
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quoted(r#"we"ird"#), r#""we""ird""#);
        let q = delete(&users(), json!(1));
        assert_eq!(
            q.sql,
            r#"DELETE FROM "app"."users" WHERE "id" = $1::bigint RETURNING "id""#
        );
    }
}
