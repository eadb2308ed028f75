//! Body encoding helpers

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

use crate::error::{Result, XhrError};

/// Bytes left as-is in a URI component: alphanumerics and `-_.!~*'()`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encode flat fields as `key=value` pairs joined by `&`.
///
/// Values are percent-encoded as URI components (a space becomes `%20`); keys
/// are written as given. Only strings and numbers have a usable string form.
pub fn body_to_string(fields: &Map<String, Value>) -> Result<String> {
    let mut pairs = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        let text = match value {
            Value::String(text) => text.clone(),
            Value::Number(number) => number.to_string(),
            other => {
                return Err(XhrError::Encode(format!(
                    "value of field '{}' must be a string or number, got {}",
                    key,
                    json_kind(other)
                )))
            }
        };
        pairs.push(format!("{}={}", key, utf8_percent_encode(&text, COMPONENT)));
    }
    Ok(pairs.join("&"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
