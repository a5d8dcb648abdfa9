//! Serializer backend selection and format sniffing.

use std::fmt;

use thiserror::Error;

use crate::error::SerializationError;
use crate::igbinary;
use php_codec::Value;

/// A name did not resolve to any serializer backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown serializer {0:?}")]
pub struct UnknownSerializer(pub String);

/// An interchangeable binary serialization backend.
///
/// `Php` is the portable textual format; `Igbinary` is the compact binary
/// one. Both are pure Rust here, so availability is unconditional; the
/// enum stays the injectable strategy so callers and tests can force
/// either backend deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Serializer {
    /// PHP serialize syntax (portable, the default).
    #[default]
    Php,
    /// igbinary v2 (compact binary).
    Igbinary,
}

impl Serializer {
    /// Case-insensitive lookup, failing on unrecognized names.
    pub fn instance(name: &str) -> Result<Self, UnknownSerializer> {
        Self::cast(name).ok_or_else(|| UnknownSerializer(name.to_string()))
    }

    /// Case-insensitive lookup; `None` for unrecognized names.
    pub fn cast(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("php") {
            Some(Serializer::Php)
        } else if name.eq_ignore_ascii_case("igbinary") {
            Some(Serializer::Igbinary)
        } else {
            None
        }
    }

    /// Whether this backend can be used in the current build.
    ///
    /// Both backends are implemented natively, so this is always true; it
    /// exists because callers select backends by capability.
    pub const fn is_available(self) -> bool {
        true
    }

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Serializer::Php => "php",
            Serializer::Igbinary => "igbinary",
        }
    }

    /// Identify which backend produced `payload` from its leading bytes.
    ///
    /// The igbinary magic wins over PHP syntax; a payload matching neither
    /// yields `None`. This is an ordered match over byte prefixes, not a
    /// try-each-decoder cascade, so failure messages stay per-format.
    pub fn sniff(payload: &[u8]) -> Option<Serializer> {
        if payload.starts_with(&igbinary::HEADER) {
            return Some(Serializer::Igbinary);
        }
        if payload.len() >= 2
            && matches!(payload[0], b'N' | b'b' | b'i' | b'd' | b's' | b'a' | b'O')
            && matches!(payload[1], b':' | b';')
        {
            return Some(Serializer::Php);
        }
        None
    }

    /// Serialize a value to this backend's byte format.
    pub fn serialize(self, value: &Value) -> Result<Vec<u8>, SerializationError> {
        match self {
            Serializer::Php => Ok(php_codec::to_vec(value)),
            Serializer::Igbinary => {
                igbinary::to_vec(value).map_err(|source| SerializationError::TooLarge { source })
            }
        }
    }

    /// Deserialize this backend's byte format to an owned value.
    pub fn deserialize(self, payload: &[u8]) -> Result<Value<'static>, SerializationError> {
        match self {
            Serializer::Php => php_codec::from_bytes(payload)
                .map(Value::into_owned)
                .map_err(|source| SerializationError::Php { source }),
            Serializer::Igbinary => igbinary::from_bytes(payload)
                .map_err(|source| SerializationError::Igbinary { source }),
        }
    }
}

impl fmt::Display for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_is_case_insensitive() {
        assert_eq!(Serializer::instance("php").unwrap(), Serializer::Php);
        assert_eq!(Serializer::instance("PHP").unwrap(), Serializer::Php);
        assert_eq!(
            Serializer::instance("IgBinary").unwrap(),
            Serializer::Igbinary
        );
        assert_eq!(
            Serializer::instance("msgpack").unwrap_err(),
            UnknownSerializer("msgpack".to_string())
        );
    }

    #[test]
    fn cast_never_fails() {
        assert_eq!(Serializer::cast("igbinary"), Some(Serializer::Igbinary));
        assert_eq!(Serializer::cast("nope"), None);
    }

    #[test]
    fn sniff_prefers_igbinary_magic() {
        // The igbinary magic wins even when the tail resembles PHP syntax
        let mut payload = igbinary::HEADER.to_vec();
        payload.extend_from_slice(b"s:3:\"abc\";");
        assert_eq!(Serializer::sniff(&payload), Some(Serializer::Igbinary));
    }

    #[test]
    fn sniff_recognizes_php_tags() {
        for payload in [
            &b"N;"[..],
            b"b:1;",
            b"i:0;",
            b"d:0;",
            b"s:1:\"x\";",
            b"a:0:{}",
            b"O:8:\"stdClass\":0:{}",
        ] {
            assert_eq!(Serializer::sniff(payload), Some(Serializer::Php), "{:?}", payload);
        }
    }

    #[test]
    fn sniff_rejects_garbage() {
        for payload in [&b""[..], b"x", b"xyz", b"invalid:data", b"hello"] {
            assert_eq!(Serializer::sniff(payload), None, "{:?}", payload);
        }
    }

    #[test]
    fn round_trip_both_backends() {
        let value = Value::Array(vec![(Value::from("k"), Value::Int(42))]);
        for backend in [Serializer::Php, Serializer::Igbinary] {
            assert!(backend.is_available());
            let wire = backend.serialize(&value).unwrap();
            assert_eq!(Serializer::sniff(&wire), Some(backend));
            assert_eq!(backend.deserialize(&wire).unwrap(), value);
        }
    }
}
