//! # JSON bridge
//!
//! Conversions between [`Value`] and `serde_json::Value`, so that a dynamic value tree
//! can be printed or read as JSON.
//!
//! JSON has no bytes, date-time or typed map keys, so the conversion to JSON is lossy:
//!
//! * `Bytes` become an array of numbers.
//! * `DateTime` becomes an RFC 3339 string in UTC (e.g. `2024-01-02T03:04:05.500Z`).
//! * Map keys become strings.
//!
//! The decoder accepts every one of these shapes back for the matching field types.
use super::{Key, Mapping, Value};
use chrono::NaiveDateTime;

/// Format used when rendering a `DateTime` as a JSON string.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Renders a date-time the way the JSON bridge does.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Int(i) => serde_json::Value::from(i),
            Value::UInt(u) => serde_json::Value::from(u),
            // NaN and infinities have no JSON representation and map to null
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bytes(bytes) => bytes.into_iter().map(serde_json::Value::from).collect(),
            Value::String(s) => serde_json::Value::String(s),
            Value::DateTime(dt) => serde_json::Value::String(format_datetime(&dt)),
            Value::Sequence(items) => items.into_iter().map(serde_json::Value::from).collect(),
            Value::Mapping(mapping) => serde_json::Value::Object(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key.to_string(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => items.into_iter().map(Value::from).collect(),
            serde_json::Value::Object(object) => Value::Mapping(
                object
                    .into_iter()
                    .map(|(key, value)| (Key::String(key), value.into()))
                    .collect::<Mapping>(),
            ),
        }
    }
}
