//! JSON-lines parser with recursive field flattening.
//!
//! Objects flatten to dotted paths (`labels.App.Name`) and arrays to indexed paths
//! (`tags[0]`); every scalar is stored as a string. Timestamp, level and message are
//! resolved from ordered candidate keys, looked up first among the top-level keys and
//! then among the flattened paths, so both `{"log.level": ..}` and `{"log": {"level": ..}}`
//! resolve.

use crate::entry::LogEntry;
use crate::parser::timestamp::{from_epoch, parse_timestamp};
use crate::parser::LogParser;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "time", "@timestamp", "Date", "ts"];

const LEVEL_KEYS: &[&str] = &[
    "level",
    "severity",
    "Level",
    "log.level",
    "event.severity",
    "labels.severity",
];

const MESSAGE_KEYS: &[&str] = &["message", "msg", "text", "Message"];

/// Parser for one JSON document per line
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl LogParser for JsonParser {
    fn name(&self) -> &str {
        "JSON"
    }

    fn parse(&self, index: u64, raw: String) -> LogEntry {
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(_) => return LogEntry::raw(index, raw),
        };

        let mut fields = HashMap::new();
        flatten(&value, String::new(), &mut fields);

        let empty = Map::new();
        let root = value.as_object().unwrap_or(&empty);

        let timestamp = resolve(root, &fields, TIMESTAMP_KEYS, to_timestamp);
        let level = resolve(root, &fields, LEVEL_KEYS, scalar_string);
        let message = resolve(root, &fields, MESSAGE_KEYS, scalar_string)
            .unwrap_or_else(|| raw.clone());

        LogEntry {
            index,
            raw_content: raw,
            timestamp,
            level,
            message: Some(message),
            fields: Some(fields),
        }
    }
}

/// First candidate that converts, top-level keys before flattened paths
fn resolve<T>(
    root: &Map<String, Value>,
    fields: &HashMap<String, String>,
    candidates: &[&str],
    convert: fn(&Value) -> Option<T>,
) -> Option<T> {
    candidates
        .iter()
        .find_map(|key| root.get(*key).and_then(convert))
        .or_else(|| {
            candidates.iter().find_map(|key| {
                fields
                    .get(*key)
                    .and_then(|text| convert(&Value::String(text.clone())))
            })
        })
}

fn to_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(text) => parse_timestamp(text),
        Value::Number(number) => number.as_f64().and_then(from_epoch),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn flatten(value: &Value, prefix: String, fields: &mut HashMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(child, path, fields);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten(child, format!("{prefix}[{i}]"), fields);
            }
        }
        scalar => {
            if !prefix.is_empty() {
                let text = match scalar {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                fields.insert(prefix, text);
            }
        }
    }
}
