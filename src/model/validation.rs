//! Attribute validation from config rules. Failures are collected, never raised.

use crate::config::{CompiledRule, ValidationRule};
use crate::model::ValidationErrors;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Check every rule against `attributes`. Columns are visited in name order so
/// messages come out deterministically.
pub fn validate_attributes(
    attributes: &Map<String, Value>,
    rules: &HashMap<String, CompiledRule>,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    let mut columns: Vec<&String> = rules.keys().collect();
    columns.sort();
    for col in columns {
        let compiled = &rules[col];
        let rule = &compiled.rule;
        let val = attributes.get(col.as_str()).filter(|v| !is_blank(v));
        match val {
            None => {
                if rule.required == Some(true) {
                    errors.add(col.clone(), "can't be blank");
                }
            }
            Some(v) => validate_field(col, v, compiled, &mut errors),
        }
    }
    errors
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn validate_field(col: &str, v: &Value, compiled: &CompiledRule, errors: &mut ValidationErrors) {
    let rule: &ValidationRule = &compiled.rule;
    if let Some(format) = &rule.format {
        if !format_matches(v, format) {
            errors.add(col, "is invalid");
        }
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                errors.add(col, format!("is too long (maximum is {} characters)", max));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                errors.add(col, format!("is too short (minimum is {} characters)", min));
            }
        }
        if let Some(re) = &compiled.pattern {
            if !re.is_match(s) {
                errors.add(col, "is invalid");
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            errors.add(col, "is not included in the list");
        }
    }
    if rule.minimum.is_some() || rule.maximum.is_some() {
        match as_number(v) {
            None => errors.add(col, "is not a number"),
            Some(n) => {
                if let Some(min) = rule.minimum {
                    if n < min {
                        errors.add(col, format!("must be greater than or equal to {}", min));
                    }
                }
                if let Some(max) = rule.maximum {
                    if n > max {
                        errors.add(col, format!("must be less than or equal to {}", max));
                    }
                }
            }
        }
    }
}

/// Form params arrive as strings, so numeric rules accept numeric text.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        (Value::String(s), Value::Number(m)) | (Value::Number(m), Value::String(s)) => {
            s.parse::<f64>().ok() == m.as_f64()
        }
        _ => a == b,
    }
}

fn format_matches(v: &Value, format: &str) -> bool {
    let Some(s) = v.as_str() else {
        return true;
    };
    match format.to_lowercase().as_str() {
        "email" => s.contains('@') && s.len() >= 3,
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        _ => true,
    }
}
