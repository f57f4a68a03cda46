//! 通用记录类型

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Separator between key-field values in a composite identity.
const KEY_SEPARATOR: char = '\u{1f}';

/// Something a collection view can sort, filter and select.
pub trait ListItem {
    /// Identity that survives edits and re-fetches.
    fn key(&self) -> String;

    /// Value of a named field, `None` when absent.
    fn field(&self, name: &str) -> Option<Value>;

    /// Every field value, used by `*` filters.
    fn field_values(&self) -> Vec<Value>;
}

/// An opaque row: named fields plus the names of the fields forming its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    fields: Map<String, Value>,
    #[serde(skip, default = "default_key_fields")]
    key_fields: Vec<String>,
}

fn default_key_fields() -> Vec<String> {
    vec!["id".to_string()]
}

impl Record {
    /// Wrap `fields`, keyed by `id`.
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            key_fields: default_key_fields(),
        }
    }

    /// Wrap `fields` with a composite identity, e.g. `["remote_user", "domain"]`.
    pub fn with_key_fields(fields: Map<String, Value>, key_fields: &[&str]) -> Self {
        Self {
            fields,
            key_fields: key_fields.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Build from a JSON object; anything else yields an empty record.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Self::new(Map::new()),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String form of a field (numbers and booleans are stringified).
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.fields.get(name).and_then(value_to_text)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

impl ListItem for Record {
    fn key(&self) -> String {
        let mut key = String::new();
        for (i, name) in self.key_fields.iter().enumerate() {
            if i > 0 {
                key.push(KEY_SEPARATOR);
            }
            if let Some(text) = self.get_str(name) {
                key.push_str(&text);
            }
        }
        key
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    fn field_values(&self) -> Vec<Value> {
        self.fields.values().cloned().collect()
    }
}

/// Text form of a scalar value. Arrays, objects and null have none.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
