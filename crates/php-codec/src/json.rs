//! JSON conversion for decoded values.
//!
//! Enable the `serde` feature to use this module.

use serde_json::{json, Map, Value as JsonValue};

use crate::types::Value;

/// Convert a decoded value to a JSON value.
///
/// # Mapping Rules
///
/// | Wire Type | JSON Type |
/// |-----------|-----------|
/// | `null` | `null` |
/// | `bool` | `boolean` |
/// | `int` | `number` |
/// | `float` | `number` (or `null` for NaN) |
/// | `string` | `string` (lossy UTF-8 conversion) |
/// | `array` (indexed) | `array` |
/// | `array` (associative) | `object` |
/// | `object` | `object` with `__class__` field |
///
/// # Example
///
/// ```rust
/// use php_codec::{from_bytes, to_json};
///
/// let data = br#"a:2:{s:4:"name";s:5:"Alice";s:3:"age";i:30;}"#;
/// let value = from_bytes(data).unwrap();
/// assert_eq!(to_json(&value), serde_json::json!({"name": "Alice", "age": 30}));
/// ```
pub fn to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(i) => json!(*i),
        Value::Float(f) => {
            if f.is_nan() {
                JsonValue::Null
            } else if f.is_infinite() {
                if f.is_sign_positive() {
                    json!("Infinity")
                } else {
                    json!("-Infinity")
                }
            } else {
                json!(*f)
            }
        }
        Value::String(s) => {
            let string = String::from_utf8_lossy(s);
            JsonValue::String(string.into_owned())
        }
        Value::Array(items) => {
            // Sequential integer keys starting from 0 render as a JSON array
            let is_indexed = items
                .iter()
                .enumerate()
                .all(|(i, (k, _))| matches!(k, Value::Int(idx) if *idx as usize == i));

            if is_indexed {
                let arr: Vec<JsonValue> = items.iter().map(|(_, v)| to_json(v)).collect();
                JsonValue::Array(arr)
            } else {
                let mut map = Map::new();
                for (k, v) in items {
                    let key = match k {
                        Value::String(s) => String::from_utf8_lossy(s).into_owned(),
                        Value::Int(i) => i.to_string(),
                        _ => continue, // Skip invalid keys
                    };
                    map.insert(key, to_json(v));
                }
                JsonValue::Object(map)
            }
        }
        Value::Object {
            class_name,
            properties,
        } => {
            let mut map = Map::new();
            map.insert("__class__".to_string(), json!(class_name.as_ref()));

            for prop in properties {
                let key = match prop.visibility {
                    crate::types::Visibility::Private => {
                        if let Some(ref class) = prop.declaring_class {
                            format!("{}::{}", class, prop.name)
                        } else {
                            prop.name.to_string()
                        }
                    }
                    crate::types::Visibility::Protected => {
                        format!("*{}", prop.name)
                    }
                    crate::types::Visibility::Public => prop.name.to_string(),
                };
                map.insert(key, to_json(&prop.value));
            }

            JsonValue::Object(map)
        }
    }
}

/// Convert a decoded value to a JSON string.
pub fn to_json_string(value: &Value) -> serde_json::Result<String> {
    let json = to_json(value);
    serde_json::to_string(&json)
}

/// Convert a decoded value to a pretty-printed JSON string.
pub fn to_json_string_pretty(value: &Value) -> serde_json::Result<String> {
    let json = to_json(value);
    serde_json::to_string_pretty(&json)
}
