//! Resolved store model: config validated and flattened for runtime use.

use crate::config::{RelationKind, ValidationRule};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Primary key type for parsing path ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    /// PostgreSQL type for `$n::type` casts when binding string values.
    pub pg_type: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RelationSpec {
    pub name: String,
    pub kind: RelationKind,
    pub target: String,
    pub foreign_key: String,
}

/// A validation rule with its pattern compiled once at resolve time.
#[derive(Clone, Debug)]
pub struct CompiledRule {
    pub rule: ValidationRule,
    pub pattern: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(column: &str, rule: ValidationRule) -> Result<Self, ConfigError> {
        let pattern = rule
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ConfigError::Validation(format!("invalid pattern for {}: {}", column, e)))?;
        Ok(CompiledRule { rule, pattern })
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedTable {
    pub name: String,
    pub schema_name: String,
    pub table_name: String,
    pub primary_key: String,
    pub pk_type: PkType,
    /// Empty for schemaless models.
    pub columns: Vec<ColumnInfo>,
    pub validation: HashMap<String, CompiledRule>,
    pub relations: Vec<RelationSpec>,
}

impl ResolvedTable {
    pub fn relation(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_schemaless(&self) -> bool {
        self.columns.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModels {
    pub tables: Vec<Arc<ResolvedTable>>,
    pub by_name: HashMap<String, Arc<ResolvedTable>>,
}

impl ResolvedModels {
    pub fn table(&self, name: &str) -> Option<&Arc<ResolvedTable>> {
        self.by_name.get(name)
    }
}
