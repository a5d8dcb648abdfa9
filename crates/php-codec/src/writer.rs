//! Writer for PHP's serialize wire syntax.
//!
//! The output is byte-exact: feeding it back through [`crate::from_bytes`]
//! reproduces the original value, and the bytes match what PHP's own
//! `serialize()` emits for the supported kinds.

use std::io::Write;

use crate::types::Value;

/// Serialize a value to PHP serialize bytes.
///
/// Infallible: the closed [`Value`] type admits only serializable kinds.
/// Array keys are expected to be `Int` or `String` (the parsers enforce
/// this); other key kinds are written as-is and will not re-parse.
///
/// # Example
///
/// ```rust
/// use php_codec::{to_vec, Value};
///
/// assert_eq!(to_vec(&Value::Int(42)), b"i:42;");
/// assert_eq!(to_vec(&Value::from("hello")), b"s:5:\"hello\";");
/// ```
pub fn to_vec(value: &Value) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"N;"),
        Value::Bool(false) => out.extend_from_slice(b"b:0;"),
        Value::Bool(true) => out.extend_from_slice(b"b:1;"),
        Value::Int(i) => {
            // Vec<u8> as an io::Write sink never errors
            let _ = write!(out, "i:{};", i);
        }
        Value::Float(f) => {
            let _ = write!(out, "d:{};", format_float(*f));
        }
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            let _ = write!(out, "a:{}:{{", items.len());
            for (key, value) in items {
                write_value(out, key);
                write_value(out, value);
            }
            out.push(b'}');
        }
        Value::Object {
            class_name,
            properties,
        } => {
            let _ = write!(
                out,
                "O:{}:\"{}\":{}:{{",
                class_name.len(),
                class_name,
                properties.len()
            );
            for prop in properties {
                write_string(out, &prop.wire_name());
                write_value(out, &prop.value);
            }
            out.push(b'}');
        }
    }
}

fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let _ = write!(out, "s:{}:\"", bytes.len());
    out.extend_from_slice(bytes);
    out.extend_from_slice(b"\";");
}

/// Format a float the way PHP serialize spells it.
///
/// Rust's shortest-round-trip display keeps `parse` exact; the non-finite
/// spellings match what the parser accepts. `-0.0` prints as `-0`.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f == f64::INFINITY {
        "INF".to_string()
    } else if f == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{}", f)
    }
}
