//! Driver-neutral parameter and row types.
//!
//! Both backends bind [`Value`]s positionally and hand rows back as [`Row`]s,
//! so the entity stores never touch a driver type directly.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::{DatastoreError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

/// Opaque JSON blobs are stored as their serialized text.
impl From<&JsonValue> for Value {
    fn from(v: &JsonValue) -> Self {
        Value::Text(v.to_string())
    }
}

/// One result row, addressed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn has(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn get(&self, column: &str) -> Result<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| DatastoreError::decode("decoding row", format!("no column {}", column)))
    }

    /// NULL decodes as the empty string, which is what outer joins produce
    /// for missing partners.
    pub fn text(&self, column: &str) -> Result<String> {
        match self.get(column)? {
            Value::Null => Ok(String::new()),
            Value::Text(s) => Ok(s.clone()),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Real(f) => Ok(f.to_string()),
        }
    }

    pub fn int(&self, column: &str) -> Result<i64> {
        match self.get(column)? {
            Value::Null => Ok(0),
            Value::Integer(i) => Ok(*i),
            Value::Real(f) => Ok(*f as i64),
            Value::Text(s) => s.trim().parse().map_err(|_| {
                DatastoreError::decode("decoding row", format!("column {} is not an integer: {:?}", column, s))
            }),
        }
    }

    pub fn int32(&self, column: &str) -> Result<i32> {
        let v = self.int(column)?;
        i32::try_from(v).map_err(|_| {
            DatastoreError::decode("decoding row", format!("column {} out of range: {}", column, v))
        })
    }

    pub fn bool(&self, column: &str) -> Result<bool> {
        Ok(self.int(column)? != 0)
    }

    pub fn json(&self, column: &str) -> Result<JsonValue> {
        let raw = self.text(column)?;
        if raw.is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_str(&raw).map_err(|e| {
            DatastoreError::decode("decoding row", format!("column {} is not JSON: {}", column, e))
        })
    }
}

/// Decodes an entity from a named-column row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, Value)]) -> Row {
        let columns: Arc<[String]> = pairs.iter().map(|(c, _)| c.to_string()).collect();
        Row::new(columns, pairs.iter().map(|(_, v)| v.clone()).collect())
    }

    #[test]
    fn test_typed_accessors() {
        let r = row(&[
            ("name", Value::Text("alice".into())),
            ("count", Value::Integer(3)),
            ("flag", Value::Integer(1)),
            ("meta", Value::Text(r#"{"k":1}"#.into())),
            ("missing", Value::Null),
        ]);

        assert_eq!(r.text("name").unwrap(), "alice");
        assert_eq!(r.int("count").unwrap(), 3);
        assert!(r.bool("flag").unwrap());
        assert_eq!(r.json("meta").unwrap()["k"], 1);
        assert_eq!(r.text("missing").unwrap(), "");
        assert_eq!(r.int("missing").unwrap(), 0);
        assert_eq!(r.json("missing").unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_numeric_text_parses() {
        // MySQL hands some aggregates back as text
        let r = row(&[("n", Value::Text("42".into()))]);
        assert_eq!(r.int("n").unwrap(), 42);
        assert_eq!(r.int32("n").unwrap(), 42);
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let r = row(&[("a", Value::Integer(1))]);
        assert!(!r.has("b"));
        assert!(matches!(r.int("b"), Err(DatastoreError::Statement { .. })));
    }

    #[test]
    fn test_bool_and_json_bind_as_expected() {
        assert_eq!(Value::from(true), Value::Integer(1));
        let meta = serde_json::json!({"a": [1, 2]});
        assert_eq!(Value::from(&meta), Value::Text(r#"{"a":[1,2]}"#.into()));
    }
}
