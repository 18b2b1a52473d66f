//! Load settings from the environment and store config from JSON files.

use crate::config::resolved::{ColumnInfo, CompiledRule, PkType, RelationSpec, ResolvedModels, ResolvedTable};
use crate::config::types::*;
use crate::config::validate;
use crate::error::ConfigError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Build resolved models from store config (validates first).
pub fn resolve(config: &StoreConfig) -> Result<ResolvedModels, ConfigError> {
    validate(config)?;

    let mut tables = Vec::with_capacity(config.models.len());
    let mut by_name = HashMap::new();
    for m in &config.models {
        let pk_type = m
            .columns
            .iter()
            .find(|c| c.name == m.primary_key)
            .and_then(|c| c.type_.as_deref())
            .map(infer_pk_type)
            .unwrap_or(PkType::BigInt);
        let columns = m
            .columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.name.clone(),
                pg_type: c.type_.as_deref().map(cast_type_name),
            })
            .collect();
        let relations = m
            .relationships
            .iter()
            .map(|r| RelationSpec {
                name: r.name.clone(),
                kind: r.kind,
                target: r.model.clone(),
                foreign_key: r.foreign_key.clone(),
            })
            .collect();
        let validation = m
            .validation
            .iter()
            .map(|(col, rule)| {
                CompiledRule::compile(&format!("{}.{}", m.name, col), rule.clone())
                    .map(|compiled| (col.clone(), compiled))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;
        let table = Arc::new(ResolvedTable {
            name: m.name.clone(),
            schema_name: m.schema.clone(),
            table_name: m.table_name().to_string(),
            primary_key: m.primary_key.clone(),
            pk_type,
            columns,
            validation,
            relations,
        });
        by_name.insert(m.name.clone(), table.clone());
        tables.push(table);
    }

    Ok(ResolvedModels { tables, by_name })
}

fn infer_pk_type(type_str: &str) -> PkType {
    let type_lower = type_str.to_lowercase();
    if type_lower.contains("uuid") {
        PkType::Uuid
    } else if type_lower.contains("bigserial") || type_lower.contains("bigint") {
        PkType::BigInt
    } else if type_lower.contains("serial") || type_lower.contains("int") {
        PkType::Int
    } else {
        PkType::Text
    }
}

/// Serial pseudo-types are not valid cast targets.
fn cast_type_name(type_str: &str) -> String {
    match type_str.to_lowercase().as_str() {
        "bigserial" => "bigint".into(),
        "serial" => "integer".into(),
        "smallserial" => "smallint".into(),
        other => other.to_string(),
    }
}

impl Settings {
    /// Read settings from the process environment (loading `.env` first when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let body_limit = std::env::var("BODY_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_BODY_LIMIT);
        Settings {
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into()),
            config_path: std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".into()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            body_limit,
        }
    }

    /// Database config for the current environment. `DATABASE_URL` wins over the file;
    /// `Ok(None)` when neither provides one.
    pub async fn database(&self) -> Result<Option<DatabaseConfig>, ConfigError> {
        let path = Path::new(&self.config_path).join("database.json");
        let from_file = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            DatabaseConfig::load(&path, &self.environment).await?
        } else {
            None
        };
        Ok(match (&self.database_url, from_file) {
            (Some(url), file) => Some(DatabaseConfig {
                url: url.clone(),
                max_connections: file.map(|f| f.max_connections).unwrap_or(5),
            }),
            (None, file) => file,
        })
    }

    pub async fn store_config(&self) -> Result<StoreConfig, ConfigError> {
        load_store_config(Path::new(&self.config_path).join("models.json")).await
    }
}

impl DatabaseConfig {
    /// Read the `environment` section of a `database.json` file.
    pub async fn load(path: impl AsRef<Path>, environment: &str) -> Result<Option<DatabaseConfig>, ConfigError> {
        let raw = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.as_ref().display(), e)))?;
        let mut by_env: HashMap<String, DatabaseConfig> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Load(e.to_string()))?;
        Ok(by_env.remove(environment))
    }
}

pub async fn load_store_config(path: impl AsRef<Path>) -> Result<StoreConfig, ConfigError> {
    let raw = tokio::fs::read_to_string(path.as_ref())
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.as_ref().display(), e)))?;
    tracing::debug!(path = %path.as_ref().display(), "loading store config");
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(e.to_string()))
}
