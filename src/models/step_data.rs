//! # Step Data
//!
//! Key/value state carried by a step instance (and, with the same shape, the
//! dynamic data of a workflow instance).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// String-keyed structured state with last-writer-wins merge semantics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepData(Map<String, Value>);

impl StepData {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build from a JSON value; anything other than an object yields `None`
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Apply `delta` over this data. Existing keys are never removed; keys in
    /// `delta` overwrite matching keys.
    pub fn merge(&mut self, delta: StepData) {
        for (key, value) in delta.0 {
            self.0.insert(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for StepData {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for StepData {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Build [`StepData`] from a `serde_json::json!` object literal
#[macro_export]
macro_rules! step_data {
    ($($json:tt)+) => {
        $crate::models::StepData::from_value(serde_json::json!($($json)+))
            .unwrap_or_default()
    };
}
