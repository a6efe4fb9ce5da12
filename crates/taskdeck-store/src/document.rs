//! Documents, collection snapshots and server-assigned timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::CollectionRef;

/// Field map of a document. Always a JSON object.
pub type Fields = serde_json::Map<String, Value>;

const SERVER_TIMESTAMP_KEY: &str = "$serverTimestamp";

/// Sentinel field value replaced by the store's commit time when a write is applied.
pub fn server_timestamp() -> Value {
    let mut sentinel = Fields::new();
    sentinel.insert(SERVER_TIMESTAMP_KEY.to_string(), Value::Bool(true));
    Value::Object(sentinel)
}

fn is_server_timestamp(value: &Value) -> bool {
    match value.as_object() {
        Some(obj) => obj.len() == 1 && obj.get(SERVER_TIMESTAMP_KEY) == Some(&Value::Bool(true)),
        None => false,
    }
}

/// Replace every server timestamp sentinel in `fields`, at any depth, with `now`.
pub(crate) fn resolve_server_timestamps(fields: &mut Fields, now: DateTime<Utc>) {
    let stamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    for value in fields.values_mut() {
        resolve_value(value, &stamp);
    }
}

fn resolve_value(value: &mut Value, stamp: &str) {
    if is_server_timestamp(value) {
        *value = Value::String(stamp.to_string());
        return;
    }
    match value {
        Value::Object(obj) => obj.values_mut().for_each(|v| resolve_value(v, stamp)),
        Value::Array(items) => items.iter_mut().for_each(|v| resolve_value(v, stamp)),
        _ => {}
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
    pub update_time: DateTime<Utc>,
}

impl Document {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Every document of a collection at one point in time, ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub collection: CollectionRef,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn empty(collection: CollectionRef) -> Self {
        Self {
            collection,
            documents: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.iter().any(|d| d.id == id)
    }
}
