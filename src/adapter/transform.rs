//! # Value Transforms
//!
//! Hook applied to every property value before it becomes an attribute.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde_json::Value;
use tracing::warn;

use super::files::{is_url, DataUri, FileStore};
use crate::model::{FieldDescriptor, ValueType};

/// Outgoing attribute value hook
pub trait ValueTransform: Send + Sync {
    fn transform(&self, field: &FieldDescriptor, value: Value) -> Value;
}

/// Leaves every value untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl ValueTransform for IdentityTransform {
    fn transform(&self, _field: &FieldDescriptor, value: Value) -> Value {
        value
    }
}

/// Canonical attribute values
///
/// - booleans are coerced from numbers and strings
/// - dates, datetimes and times become integer timestamps (seconds)
/// - file and image paths become `data:` URIs, `null` when unreadable
pub struct StandardValueTransform {
    files: Option<Arc<dyn FileStore>>,
}

impl StandardValueTransform {
    pub fn new() -> Self {
        Self { files: None }
    }

    pub fn with_file_store(files: Arc<dyn FileStore>) -> Self {
        Self { files: Some(files) }
    }

    fn file_value(&self, field: &FieldDescriptor, path: &str) -> Value {
        if path.is_empty() || is_url(path) || DataUri::is_data_uri(path) {
            return Value::String(path.to_string());
        }

        let files = match &self.files {
            Some(files) => files,
            None => return Value::String(path.to_string()),
        };

        match files.read(path) {
            Ok(data) => Value::String(DataUri::from_path(path, data).encode()),
            Err(e) => {
                warn!(field = %field.name, path, error = %e, "Could not encode file value");
                Value::Null
            }
        }
    }
}

impl Default for StandardValueTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueTransform for StandardValueTransform {
    fn transform(&self, field: &FieldDescriptor, value: Value) -> Value {
        let value_type = match field.value_type() {
            Some(value_type) => value_type,
            None => return value,
        };

        match value_type {
            ValueType::Boolean => Value::Bool(truthy(&value)),
            t if t.is_temporal() => match &value {
                Value::String(s) => timestamp(s, t)
                    .map(Value::from)
                    .unwrap_or(value),
                _ => value,
            },
            t if t.is_file() => match &value {
                Value::String(path) => self.file_value(field, path),
                _ => value,
            },
            _ => value,
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no" | "off"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Seconds since the epoch, or since midnight for times
fn timestamp(value: &str, value_type: ValueType) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }

    if value_type == ValueType::Time {
        return NaiveTime::parse_from_str(value, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
            .ok()
            .map(|t| i64::from(t.num_seconds_from_midnight()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}
