//! Identifier normalization for backend records
//!
//! The backend serializes identifiers under either `id` or the legacy
//! document-store field `_id`, depending on the endpoint and the storage
//! driver behind it. Every record entering the sync layer goes through
//! [`normalize_id`] so that internal logic only ever reads `id`.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Canonical identifier field
pub const CANONICAL_ID: &str = "id";

/// Legacy alternate identifier field
pub const LEGACY_ID: &str = "_id";

/// Ensure a record carries its identifier under [`CANONICAL_ID`]
///
/// The primary field wins when both are populated. A primary field that is
/// null or blank counts as absent. When neither field holds a usable value
/// the canonical field is removed, never invented. Non-object values are
/// returned untouched.
///
/// # Examples
///
/// ```
/// use spot_common::identity::normalize_id;
/// use serde_json::json;
///
/// let record = normalize_id(json!({"_id": "abc", "name": "Plaza"}));
/// assert_eq!(record["id"], "abc");
///
/// let record = normalize_id(json!({"id": "primary", "_id": "legacy"}));
/// assert_eq!(record["id"], "primary");
/// ```
pub fn normalize_id(mut record: Value) -> Value {
    let Some(fields) = record.as_object_mut() else {
        return record;
    };

    let resolved = fields
        .get(CANONICAL_ID)
        .and_then(identifier_text)
        .or_else(|| fields.get(LEGACY_ID).and_then(identifier_text));

    match resolved {
        Some(id) => {
            fields.insert(CANONICAL_ID.to_string(), Value::String(id));
        }
        None => {
            fields.remove(CANONICAL_ID);
        }
    }

    record
}

/// Render an identifier value as text
///
/// Accepts strings, integers, and extended-JSON object ids (`{"$oid": "..."}`).
fn identifier_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(identifier_text),
        _ => None,
    }
}

/// Normalize and decode a single record
///
/// A record that still lacks a canonical identifier after normalization is a
/// data-quality error, as is any record that does not fit the target type.
pub fn decode<T: DeserializeOwned>(record: Value) -> Result<T> {
    let record = normalize_id(record);

    if record.get(CANONICAL_ID).is_none() {
        return Err(Error::DataQuality(format!(
            "record has neither `{}` nor `{}`",
            CANONICAL_ID, LEGACY_ID
        )));
    }

    serde_json::from_value(record).map_err(|e| Error::DataQuality(e.to_string()))
}

/// Normalize and decode a batch, dropping records that fail
///
/// Dropped records are logged; the surviving records keep their order.
pub fn decode_all<T: DeserializeOwned>(records: Vec<Value>) -> Vec<T> {
    let total = records.len();
    let decoded: Vec<T> = records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match decode(record) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(index, error = %e, "Dropping backend record");
                None
            }
        })
        .collect();

    if decoded.len() < total {
        warn!(
            total,
            kept = decoded.len(),
            "Some backend records failed normalization"
        );
    }

    decoded
}
