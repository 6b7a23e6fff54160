use crate::types::ConfigMap;
use serde_json::Value;

/// Errors raised while resolving effective settings for one host.
///
/// These surface at resolution time, before any network traffic, and are
/// converted into a host-scoped error verdict by the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A setting is present but has the wrong shape (e.g. a string where a
    /// number is expected). Values are never coerced.
    #[error("config key '{key}': expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    /// A user-supplied pattern failed to compile.
    #[error("config key '{key}': invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        key: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Layered view over config maps, narrowest first.
///
/// Lookup walks the layers in order and returns the first hit; missing keys
/// silently fall through, and a key missing everywhere is answered by the
/// caller's built-in fallback (`unwrap_or` at the call site). The input maps
/// are never mutated.
pub struct Layers<'a> {
    layers: Vec<&'a ConfigMap>,
}

impl<'a> Layers<'a> {
    pub fn new(layers: Vec<&'a ConfigMap>) -> Self {
        Self { layers }
    }

    /// First value found for `key`, searching narrowest layer first.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| invalid(key, "a number")),
        }
    }

    pub fn get_u64(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| invalid(key, "a non-negative integer")),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| invalid(key, "a boolean")),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&'a str>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| invalid(key, "a string")),
        }
    }

    /// A string value is treated as a one-element list.
    pub fn get_str_list(&self, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(vec![s.clone()])),
            Some(Value::Array(items)) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    match item.as_str() {
                        Some(s) => list.push(s.to_string()),
                        None => return Err(invalid(key, "a string or list of strings")),
                    }
                }
                Ok(Some(list))
            }
            Some(_) => Err(invalid(key, "a string or list of strings")),
        }
    }
}

fn invalid(key: &str, expected: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        expected,
    }
}
