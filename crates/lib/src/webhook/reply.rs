//! Reply extraction: reduce whatever JSON shape the destination sends to a
//! display string.
//!
//! n8n-style workflows variously reply with `{output}`, `{text}`, `{message}`,
//! an array holding one such item, or a bare string. This function is total:
//! every shape has a defined output and nothing here can fail.

use serde_json::Value;

/// Candidate reply fields, in lookup order.
const TEXT_FIELDS: [&str; 3] = ["output", "text", "message"];

pub fn extract_reply_text(raw: &Value) -> String {
    // Destinations that emit an array of items put the reply in the first one.
    let item = match raw {
        Value::Array(items) => items.first().unwrap_or(&Value::Null),
        other => other,
    };
    if let Value::Object(fields) = item {
        for key in TEXT_FIELDS {
            if let Some(Value::String(s)) = fields.get(key) {
                if !s.is_empty() {
                    return s.clone();
                }
            }
        }
    }
    if let Value::String(s) = item {
        if !s.is_empty() {
            return s.clone();
        }
    }
    // Best effort: show the raw value rather than an empty bubble.
    raw.to_string()
}
