//! Config validation: referential integrity between models and their relationships.

use crate::config::StoreConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::collections::HashSet;

pub fn validate(config: &StoreConfig) -> Result<(), ConfigError> {
    let mut model_names = HashSet::new();
    for m in &config.models {
        if !model_names.insert(m.name.as_str()) {
            return Err(ConfigError::DuplicateModel(m.name.clone()));
        }
    }

    for m in &config.models {
        let columns: HashSet<&str> = m.columns.iter().map(|c| c.name.as_str()).collect();
        if !columns.is_empty() && !columns.contains(m.primary_key.as_str()) {
            return Err(ConfigError::InvalidPrimaryKey {
                model: m.name.clone(),
                column: m.primary_key.clone(),
            });
        }

        let mut relation_names = HashSet::new();
        for r in &m.relationships {
            if !relation_names.insert(r.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate relationship '{}' on model {}",
                    r.name, m.name
                )));
            }
            if !model_names.contains(r.model.as_str()) {
                return Err(ConfigError::MissingReference {
                    kind: "model",
                    id: r.model.clone(),
                });
            }
        }

        for (col, rule) in &m.validation {
            if let Some(pattern) = &rule.pattern {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::Validation(format!("invalid pattern for {}.{}: {}", m.name, col, e))
                })?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, ValidationRule};

    fn users_and_books() -> StoreConfig {
        StoreConfig::new()
            .model(ModelConfig::new("users").has_many("books", "books", "user_id"))
            .model(ModelConfig::new("books").belongs_to("user", "users", "user_id"))
    }

    #[test]
    fn accepts_consistent_config() {
        validate(&users_and_books()).unwrap();
    }

    #[test]
    fn rejects_dangling_relationship() {
        let config = StoreConfig::new().model(ModelConfig::new("users").has_many("books", "books", "user_id"));
        assert!(matches!(
            validate(&config),
            Err(ConfigError::MissingReference { kind: "model", .. })
        ));
    }

    #[test]
    fn rejects_duplicate_model() {
        let config = users_and_books().model(ModelConfig::new("users"));
        assert!(matches!(validate(&config), Err(ConfigError::DuplicateModel(n)) if n == "users"));
    }

    #[test]
    fn rejects_primary_key_outside_columns() {
        let config = StoreConfig::new().model(ModelConfig::new("users").column("uid", "uuid"));
        assert!(matches!(validate(&config), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn rejects_bad_pattern() {
        let rule = ValidationRule {
            pattern: Some("([a-z".into()),
            ..Default::default()
        };
        let config = StoreConfig::new().model(ModelConfig::new("users").rule("name", rule));
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }
}
