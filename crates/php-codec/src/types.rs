//! Value types shared by the serializer backends.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use bstr::BStr;
use memchr::memchr;

/// A value that can round-trip through the wire codecs.
///
/// Array keys are restricted to `Int` and `String` by the parsers; the
/// writers assume callers uphold the same restriction.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value<'a> {
    /// Null.
    #[default]
    Null,

    /// Boolean.
    Bool(bool),

    /// 64-bit signed integer.
    Int(i64),

    /// Double-precision float.
    Float(f64),

    /// Byte string (may contain non-UTF8 bytes).
    /// Uses Cow for zero-copy when possible.
    String(Cow<'a, [u8]>),

    /// Ordered map with mixed integer/string keys.
    Array(Vec<(Value<'a>, Value<'a>)>),

    /// Object with a class name and named properties.
    Object {
        /// The class name of the object.
        class_name: Cow<'a, str>,
        /// Object properties with their names and values.
        properties: Vec<Property<'a>>,
    },
}

/// An object property.
#[derive(Debug, Clone, PartialEq)]
pub struct Property<'a> {
    /// Property name.
    pub name: Cow<'a, str>,
    /// Property visibility.
    pub visibility: Visibility,
    /// For private properties, the class that declared it.
    pub declaring_class: Option<Cow<'a, str>>,
    /// Property value.
    pub value: Value<'a>,
}

/// Property visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Public property.
    Public,
    /// Protected property (wire name prefixed with `\0*\0`).
    Protected,
    /// Private property (wire name prefixed with `\0ClassName\0`).
    Private,
}

impl<'a> Property<'a> {
    /// Build a public property.
    pub fn public(name: impl Into<Cow<'a, str>>, value: Value<'a>) -> Self {
        Self {
            name: name.into(),
            visibility: Visibility::Public,
            declaring_class: None,
            value,
        }
    }

    /// The name as it appears on the wire, including visibility mangling.
    pub fn wire_name(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.name.len() + 4);
        match self.visibility {
            Visibility::Public => {}
            Visibility::Protected => out.extend_from_slice(b"\0*\0"),
            Visibility::Private => {
                out.push(0);
                if let Some(class) = &self.declaring_class {
                    out.extend_from_slice(class.as_bytes());
                }
                out.push(0);
            }
        }
        out.extend_from_slice(self.name.as_bytes());
        out
    }

    /// Rebuild a property from its mangled wire name.
    ///
    /// Private: `\0ClassName\0name`, protected: `\0*\0name`, public: plain.
    /// Malformed mangling degrades to a public property.
    pub fn from_wire_name(name: &[u8], value: Value<'a>) -> Self {
        if name.first() == Some(&0) {
            if let Some(second_null) = memchr(0, &name[1..]) {
                let prefix = &name[1..1 + second_null];
                let actual = String::from_utf8_lossy(&name[2 + second_null..]).into_owned();
                if prefix == b"*" {
                    return Self {
                        name: Cow::Owned(actual),
                        visibility: Visibility::Protected,
                        declaring_class: None,
                        value,
                    };
                }
                return Self {
                    name: Cow::Owned(actual),
                    visibility: Visibility::Private,
                    declaring_class: Some(Cow::Owned(String::from_utf8_lossy(prefix).into_owned())),
                    value,
                };
            }
        }
        Self {
            name: Cow::Owned(String::from_utf8_lossy(name).into_owned()),
            visibility: Visibility::Public,
            declaring_class: None,
            value,
        }
    }
}

impl<'a> Value<'a> {
    /// Check if the value is null.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if the value is a string.
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if the value is an array.
    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Get the value as a boolean.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as an integer.
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a float.
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get the value as a byte slice.
    #[inline]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Get the value as a UTF-8 string.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => std::str::from_utf8(s.as_ref()).ok(),
            _ => None,
        }
    }

    /// Get the value as an array.
    #[inline]
    pub fn as_array(&self) -> Option<&[(Value<'a>, Value<'a>)]> {
        match self {
            Value::Array(a) => Some(a.as_slice()),
            _ => None,
        }
    }

    /// Convert the array to a HashMap if all keys are strings or integers.
    pub fn as_string_map(&self) -> Option<HashMap<String, &Value<'a>>> {
        let arr = self.as_array()?;
        let mut map = HashMap::with_capacity(arr.len());
        for (k, v) in arr {
            let key = match k {
                Value::String(s) => String::from_utf8_lossy(s).into_owned(),
                Value::Int(i) => i.to_string(),
                _ => return None,
            };
            map.insert(key, v);
        }
        Some(map)
    }

    /// Convert to an owned value that doesn't borrow from the input.
    pub fn into_owned(self) -> Value<'static> {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(b),
            Value::Int(i) => Value::Int(i),
            Value::Float(f) => Value::Float(f),
            Value::String(s) => Value::String(Cow::Owned(s.into_owned())),
            Value::Array(arr) => Value::Array(
                arr.into_iter()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect(),
            ),
            Value::Object {
                class_name,
                properties,
            } => Value::Object {
                class_name: Cow::Owned(class_name.into_owned()),
                properties: properties
                    .into_iter()
                    .map(|p| Property {
                        name: Cow::Owned(p.name.into_owned()),
                        visibility: p.visibility,
                        declaring_class: p.declaring_class.map(|c| Cow::Owned(c.into_owned())),
                        value: p.value.into_owned(),
                    })
                    .collect(),
            },
        }
    }

    /// Get a type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object { .. } => "object",
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value<'_> {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value<'_> {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::String(Cow::Borrowed(s.as_bytes()))
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(s: &'a [u8]) -> Self {
        Value::String(Cow::Borrowed(s))
    }
}

impl From<String> for Value<'_> {
    fn from(s: String) -> Self {
        Value::String(Cow::Owned(s.into_bytes()))
    }
}

impl From<Vec<u8>> for Value<'_> {
    fn from(s: Vec<u8>) -> Self {
        Value::String(Cow::Owned(s))
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            // BStr renders binary strings lossily without a UTF-8 detour.
            Value::String(s) => write!(f, "\"{}\"", BStr::new(s.as_ref())),
            Value::Array(arr) => {
                write!(f, "[")?;
                for (i, (k, v)) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", k, v)?;
                }
                write!(f, "]")
            }
            Value::Object { class_name, .. } => write!(f, "{}{{...}}", class_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_name_mangling_round_trips() {
        let private = Property {
            name: Cow::Borrowed("secret"),
            visibility: Visibility::Private,
            declaring_class: Some(Cow::Borrowed("Vault")),
            value: Value::Int(1),
        };
        let wire = private.wire_name();
        assert_eq!(wire, b"\0Vault\0secret");
        let back = Property::from_wire_name(&wire, Value::Int(1));
        assert_eq!(back, private.clone().into_owned_property());

        let protected = Property {
            name: Cow::Borrowed("state"),
            visibility: Visibility::Protected,
            declaring_class: None,
            value: Value::Null,
        };
        assert_eq!(protected.wire_name(), b"\0*\0state");
        let back = Property::from_wire_name(b"\0*\0state", Value::Null);
        assert_eq!(back.visibility, Visibility::Protected);
        assert_eq!(back.name.as_ref(), "state");
    }

    #[test]
    fn malformed_mangling_degrades_to_public() {
        let p = Property::from_wire_name(b"\0broken", Value::Null);
        assert_eq!(p.visibility, Visibility::Public);
    }

    #[test]
    fn string_map_accepts_mixed_keys() {
        let v = Value::Array(vec![
            (Value::from("name"), Value::from("Alice")),
            (Value::Int(3), Value::Bool(true)),
        ]);
        let map = v.as_string_map().unwrap();
        assert_eq!(map.get("name").unwrap().as_str(), Some("Alice"));
        assert_eq!(map.get("3").unwrap().as_bool(), Some(true));
    }

    impl<'a> Property<'a> {
        fn into_owned_property(self) -> Property<'static> {
            Property {
                name: Cow::Owned(self.name.into_owned()),
                visibility: self.visibility,
                declaring_class: self.declaring_class.map(|c| Cow::Owned(c.into_owned())),
                value: self.value.into_owned(),
            }
        }
    }
}
