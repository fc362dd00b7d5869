//! Ordered field records
//!
//! A [`FieldRecord`] is the flattened key/value structure written to the audit
//! sink for a single event. Keys are unique and keep their insertion order so
//! that emitted lines read the same way every time.

use serde::Serialize;
use serde_json::{Map, Value};

/// Maximum number of characters kept for any string field in a record
pub const MAX_FIELD_CHARS: usize = 2000;

/// Cut a string to at most [`MAX_FIELD_CHARS`] characters
///
/// Strings at or below the limit are returned unchanged.
pub fn truncate(value: &str) -> String {
    match value.char_indices().nth(MAX_FIELD_CHARS) {
        Some((end, _)) => value[..end].to_string(),
        None => value.to_string(),
    }
}

/// One flattened audit log entry
///
/// Inserting an existing key replaces its value in place (last write wins)
/// without moving it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldRecord {
    fields: Map<String, Value>,
}

impl FieldRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value as-is, with no truncation
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Insert a string value, truncated to [`MAX_FIELD_CHARS`]
    pub fn insert_text(&mut self, key: impl Into<String>, value: &str) {
        self.fields.insert(key.into(), Value::String(truncate(value)));
    }

    /// Insert a truncated string value only when one is present
    pub fn insert_text_opt(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.insert_text(key, value);
        }
    }

    /// Insert a numeric or other non-string value only when one is present
    pub fn insert_opt<V: Into<Value>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    /// Look up a field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Look up a string field
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Whether the record has a field with this key
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Encode the record as a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.fields)
    }

    /// Consume the record, returning the underlying ordered map
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}
