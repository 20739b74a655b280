// Query results
// A record is the projected columns of one row plus any embedded includes.

use anyhow::{Context, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};

use super::schema::{ColumnDef, ColumnType};

/// One row returned by a query
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: &'static str,
    values: Map<String, Value>,
}

impl Record {
    pub fn new(model: &'static str, values: Map<String, Value>) -> Self {
        Self { model, values }
    }

    /// Name of the model this row belongs to
    pub fn model(&self) -> &'static str {
        self.model
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(Value::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Embedded rows of a has-many include
    pub fn get_many(&self, key: &str) -> Option<&Vec<Value>> {
        self.values.get(key).and_then(Value::as_array)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Column and include keys, in insertion order of the map
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.values)
    }

    /// Convert into a typed model
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .with_context(|| format!("Failed to decode {} record", self.model))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

/// Convert a JSON value into an SQLite parameter
pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        // Arrays and objects go into JSON columns as text
        other => SqlValue::Text(other.to_string()),
    }
}

/// Convert an SQLite value into JSON, guided by the declared column type
pub(crate) fn from_sql_value(value: ValueRef<'_>, column: Option<&ColumnDef>) -> Value {
    let column_type = column.map(|c| c.column_type);
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => match column_type {
            Some(ColumnType::Boolean) => Value::Bool(i != 0),
            _ => Value::from(i),
        },
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            match column_type {
                Some(ColumnType::Json) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
                _ => Value::String(text),
            }
        }
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
