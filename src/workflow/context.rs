//! Context store for step execution
//!
//! One `ContextStore` lives for exactly one test case execution, including
//! every nested flow call. Values are strings or structured JSON (for example
//! a parsed API response).

use serde_json::Value;
use std::collections::HashMap;

use super::expressions;

/// Scoped variable bag with `${NAME}` placeholder substitution
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    values: HashMap<String, Value>,
}

/// Prior values (or absence) of a set of keys, taken before a scoped override
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Vec<(String, Option<Value>)>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ContextStore {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with initial values
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a value, or `default` when the key is absent
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.values.get(key).cloned().unwrap_or(default)
    }

    /// String form of a value; absent keys read as the empty string
    pub fn get_string(&self, key: &str) -> String {
        self.values.get(key).map(value_to_string).unwrap_or_default()
    }

    /// Set a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace every `${NAME}` in `text` with the string form of `NAME`.
    /// Unset names substitute the empty string.
    pub fn resolve(&self, text: &str) -> String {
        expressions::substitute(text, self)
    }

    /// Record the current value (or absence) of each key
    pub fn snapshot<'k, I>(&self, keys: I) -> Snapshot
    where
        I: IntoIterator<Item = &'k str>,
    {
        Snapshot {
            entries: keys
                .into_iter()
                .map(|key| (key.to_string(), self.values.get(key).cloned()))
                .collect(),
        }
    }

    /// Put every snapshotted key back the way it was
    pub fn restore(&mut self, snapshot: Snapshot) {
        // Reverse order so a key snapshotted twice ends at its oldest value
        for (key, value) in snapshot.entries.into_iter().rev() {
            match value {
                Some(value) => {
                    self.values.insert(key, value);
                }
                None => {
                    self.values.remove(&key);
                }
            }
        }
    }
}

/// String form of a context value: strings verbatim, null as empty,
/// everything else as compact JSON
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
