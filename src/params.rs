//! Flat request parameters: query string merged with a form or JSON body.

use crate::error::AppError;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Ordered key -> value payload handed to actions as `params`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Params(Map::new())
    }

    /// Parse an urlencoded query string (without the leading `?`).
    pub fn from_query(query: Option<&str>) -> Result<Self, AppError> {
        let mut params = Params::new();
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            params.merge_urlencoded(q.as_bytes())?;
        }
        Ok(params)
    }

    /// Merge a request body over the current params. JSON bodies must be objects;
    /// anything else is treated as form-urlencoded.
    pub fn merge_body(&mut self, content_type: Option<&str>, body: &[u8]) -> Result<(), AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        let is_json = content_type
            .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
            .unwrap_or(false);
        if is_json {
            let value: Value = serde_json::from_slice(body)
                .map_err(|e| AppError::bad_request(format!("invalid JSON body: {}", e)))?;
            match value {
                Value::Object(m) => self.0.extend(m),
                _ => return Err(AppError::bad_request("body must be a JSON object")),
            }
            Ok(())
        } else {
            self.merge_urlencoded(body)
        }
    }

    fn merge_urlencoded(&mut self, raw: &[u8]) -> Result<(), AppError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(raw)
            .map_err(|e| AppError::bad_request(format!("invalid form data: {}", e)))?;
        for (k, v) in pairs {
            self.0.insert(k, Value::String(v));
        }
        Ok(())
    }

    /// Fails on the first key outside `permitted`, naming it.
    pub fn ensure_permitted(&self, permitted: &HashSet<String>) -> Result<(), AppError> {
        match self.0.keys().find(|k| !permitted.contains(k.as_str())) {
            Some(key) => Err(AppError::bad_request(format!(
                "Bad Request Error: parameter '{}' is not permitted",
                key
            ))),
            None => Ok(()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String form of a value: strings as-is, other scalars via their JSON text.
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.0.get(key).and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Params(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
