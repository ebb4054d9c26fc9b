//! Backend error bodies
//!
//! Failed requests answer with `{"detail": ...}` where `detail` is either a
//! message string or a list of validation entries carrying `msg` and `loc`.

use serde::Deserialize;
use serde_json::Value;

/// Error body returned with non-success statuses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorBody {
    /// Best-effort message from a raw response body
    ///
    /// Falls back to the trimmed body text, then to `None` for empty bodies.
    pub fn message_from(body: &str) -> Option<String> {
        let parsed = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.detail)
            .and_then(|d| detail_message(&d));

        parsed.or_else(|| {
            let text = body.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
    }
}

fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) => Some(s.clone()),
        Value::Array(entries) => {
            let parts: Vec<String> = entries.iter().filter_map(validation_entry).collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn validation_entry(entry: &Value) -> Option<String> {
    let msg = entry.get("msg").and_then(Value::as_str)?;
    let field = entry
        .get("loc")
        .and_then(Value::as_array)
        .and_then(|loc| loc.last())
        .map(|last| match last {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });

    Some(match field {
        Some(field) => format!("{}: {}", field, msg),
        None => msg.to_string(),
    })
}
