//! Query string encoder

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::DELIMITER;

/// How array values are rendered into keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrayFormat {
    /// `ids[0]=1&ids[1]=2`
    #[default]
    Indices,
    /// `ids[]=1&ids[]=2`
    Brackets,
    /// `ids=1&ids=2`
    Repeat,
    /// `ids=1,2`
    Comma,
}

/// Options controlling [`stringify`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    #[serde(rename = "array-format")]
    pub array_format: ArrayFormat,
}

impl EncodeOptions {
    pub fn new(array_format: ArrayFormat) -> Self {
        Self { array_format }
    }
}

/// Encode a JSON value as a query string (without the leading `?`)
///
/// Only objects produce output; any other top-level value encodes to the empty
/// string. `null` members encode as `key=`, empty arrays and objects are skipped.
pub fn stringify(value: &Value, options: &EncodeOptions) -> String {
    debug!(?options, "stringify: called");
    let Value::Object(map) = value else {
        debug!("stringify: top-level value is not an object");
        return String::new();
    };

    let mut pairs = Vec::new();
    for (key, member) in map {
        collect_pairs(key.clone(), member, options, &mut pairs);
    }

    pairs.join(&DELIMITER.to_string())
}

fn collect_pairs(prefix: String, value: &Value, options: &EncodeOptions, pairs: &mut Vec<String>) {
    match value {
        Value::Null => pairs.push(format!("{}=", encode_component(&prefix))),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            pairs.push(format!(
                "{}={}",
                encode_component(&prefix),
                encode_component(&scalar_to_string(value))
            ));
        }
        Value::Array(items) => {
            if items.is_empty() {
                return;
            }
            match options.array_format {
                ArrayFormat::Comma => {
                    let joined = items.iter().map(scalar_to_string).collect::<Vec<_>>().join(",");
                    pairs.push(format!("{}={}", encode_component(&prefix), encode_component(&joined)));
                }
                ArrayFormat::Indices => {
                    for (index, item) in items.iter().enumerate() {
                        collect_pairs(format!("{}[{}]", prefix, index), item, options, pairs);
                    }
                }
                ArrayFormat::Brackets => {
                    for item in items {
                        collect_pairs(format!("{}[]", prefix), item, options, pairs);
                    }
                }
                ArrayFormat::Repeat => {
                    for item in items {
                        collect_pairs(prefix.clone(), item, options, pairs);
                    }
                }
            }
        }
        Value::Object(map) => {
            for (key, member) in map {
                collect_pairs(format!("{}[{}]", prefix, key), member, options, pairs);
            }
        }
    }
}

/// Render a value the way JavaScript's `String(value)` would for query output
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or_default();
                // JS drops the trailing ".0" on integral floats
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 {
                    format!("{:.0}", f)
                } else {
                    f.to_string()
                }
            }
        }
        // Nested containers inside a comma list have no sensible scalar form
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Percent-encode a string per RFC 3986, keeping only unreserved characters
pub fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
