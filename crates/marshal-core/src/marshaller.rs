//! The serialization envelope.
//!
//! `serialize` layers optional zlib compression and optional constant-time
//! text encoding over a serializer backend, with a literal-bytes fast path
//! for trivial values. `deserialize` needs no parameters: each layer is
//! recognized from its leading bytes and peeled in order (encoding prefix,
//! value map, zlib header, backend magic).

use std::borrow::Cow;
use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::ct;
use crate::encoding::Encoding;
use crate::error::SerializationError;
use crate::serializer::Serializer;
use php_codec::Value;

/// Payloads at or below this many serialized bytes are never compressed.
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 1200;

/// zlib level 1: the envelope trades ratio for speed.
const COMPRESSION_LEVEL: u32 = 1;

/// The four canonical 2-byte zlib stream headers (by compression level).
const ZLIB_HEADERS: [[u8; 2]; 4] = [[0x78, 0x01], [0x78, 0x5e], [0x78, 0x9c], [0x78, 0xda]];

/// Options for [`serialize`].
#[derive(Debug, Clone)]
pub struct MarshalOptions {
    /// Text-encode the payload under this encoding; `None` leaves raw bytes.
    pub encoding: Option<Encoding>,
    /// Prepend the encoding's self-describing prefix.
    pub with_prefix: bool,
    /// Compress payloads larger than `compression_threshold`.
    pub compress: bool,
    /// Byte count above which compression kicks in.
    pub compression_threshold: usize,
    /// The serializer backend to use.
    pub serializer: Serializer,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            encoding: None,
            with_prefix: false,
            compress: false,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            serializer: Serializer::Php,
        }
    }
}

/// Literal wire bytes for a handful of trivial values, both directions.
///
/// These skip the backend, compression and the threshold check entirely:
/// the entries are already minimal and self-describing.
fn value_map_wire(value: &Value) -> Option<&'static [u8]> {
    match value {
        Value::Null => Some(b"N;"),
        Value::Bool(false) => Some(b"b:0;"),
        Value::Bool(true) => Some(b"b:1;"),
        Value::Int(0) => Some(b"i:0;"),
        Value::Int(1) => Some(b"i:1;"),
        Value::Float(f) if *f == 0.0 => {
            if f.is_sign_negative() {
                Some(b"d:-0;")
            } else {
                Some(b"d:0;")
            }
        }
        Value::String(s) => match s.as_ref() {
            b"" => Some(b"s:0:\"\";"),
            b"0" => Some(b"s:1:\"0\";"),
            b"1" => Some(b"s:1:\"1\";"),
            _ => None,
        },
        Value::Array(items) if items.is_empty() => Some(b"a:0:{}"),
        _ => None,
    }
}

fn value_map_lookup(wire: &[u8]) -> Option<Value<'static>> {
    match wire {
        b"N;" => Some(Value::Null),
        b"b:0;" => Some(Value::Bool(false)),
        b"b:1;" => Some(Value::Bool(true)),
        b"i:0;" => Some(Value::Int(0)),
        b"i:1;" => Some(Value::Int(1)),
        b"d:0;" => Some(Value::Float(0.0)),
        b"d:-0;" => Some(Value::Float(-0.0)),
        b"s:0:\"\";" => Some(Value::String(Cow::Borrowed(b""))),
        b"s:1:\"0\";" => Some(Value::String(Cow::Borrowed(b"0"))),
        b"s:1:\"1\";" => Some(Value::String(Cow::Borrowed(b"1"))),
        b"a:0:{}" => Some(Value::Array(Vec::new())),
        _ => None,
    }
}

/// Serialize a value into the self-describing envelope.
///
/// Pipeline: value map short-circuit, else backend serialization, then
/// compression when enabled and over threshold, then text encoding when
/// requested.
///
/// # Example
///
/// ```rust
/// use marshal_core::{deserialize, serialize, MarshalOptions, Value};
///
/// let wire = serialize(&Value::Int(42), &MarshalOptions::default()).unwrap();
/// assert_eq!(wire, b"i:42;");
/// assert_eq!(deserialize(&wire).unwrap(), Value::Int(42));
/// ```
pub fn serialize(value: &Value, options: &MarshalOptions) -> Result<Vec<u8>, SerializationError> {
    if let Some(wire) = value_map_wire(value) {
        #[cfg(feature = "tracing")]
        trace!(value_type = value.type_name(), "value map short-circuit");
        return Ok(wire.to_vec());
    }

    let mut payload = options.serializer.serialize(value)?;

    if options.compress && payload.len() > options.compression_threshold {
        #[cfg(feature = "tracing")]
        debug!(raw_len = payload.len(), "compressing payload");
        payload = deflate(&payload)?;
    }

    if let Some(encoding) = options.encoding {
        payload = ct::encode(encoding, &payload, options.with_prefix).into_bytes();
    }

    Ok(payload)
}

/// Deserialize an envelope, auto-detecting every layer.
///
/// Equivalent to [`deserialize_with_encoding`] with `None`: a recognized
/// encoding prefix is honored, otherwise the wire bytes are taken raw.
pub fn deserialize(wire: &[u8]) -> Result<Value<'static>, SerializationError> {
    deserialize_with_encoding(wire, None)
}

/// Deserialize an envelope, forcing a text encoding.
///
/// With `Some(encoding)` the wire string is text-decoded under that
/// variant (tolerant of prefix presence or absence) before the payload
/// layers are sniffed. A recognized prefix with an undecodable body is an
/// unsupported format, not an encoding-layer error: the envelope decodes
/// non-strict and keeps the error taxonomy to serialization failures.
pub fn deserialize_with_encoding(
    wire: &[u8],
    encoding: Option<Encoding>,
) -> Result<Value<'static>, SerializationError> {
    let payload: Cow<[u8]> = match encoding.or_else(|| Encoding::detect(wire)) {
        Some(encoding) => {
            #[cfg(feature = "tracing")]
            trace!(?encoding, "text-decoding wire string");
            Cow::Owned(
                ct::decode(encoding, wire, false)
                    .map_err(|_| SerializationError::UnsupportedFormat)?,
            )
        }
        None => Cow::Borrowed(wire),
    };

    if let Some(value) = value_map_lookup(&payload) {
        return Ok(value);
    }

    let payload: Cow<[u8]> = if has_zlib_header(&payload) {
        #[cfg(feature = "tracing")]
        debug!(compressed_len = payload.len(), "inflating payload");
        Cow::Owned(inflate(&payload)?)
    } else {
        payload
    };

    match Serializer::sniff(&payload) {
        Some(backend) => backend.deserialize(&payload),
        None => Err(SerializationError::UnsupportedFormat),
    }
}

fn has_zlib_header(payload: &[u8]) -> bool {
    payload.len() >= 2 && ZLIB_HEADERS.iter().any(|h| payload[..2] == h[..])
}

fn deflate(bytes: &[u8]) -> Result<Vec<u8>, SerializationError> {
    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(bytes.len() / 2),
        Compression::new(COMPRESSION_LEVEL),
    );
    encoder
        .write_all(bytes)
        .and_then(|()| encoder.finish())
        .map_err(|source| SerializationError::InvalidZlib { source })
}

fn inflate(bytes: &[u8]) -> Result<Vec<u8>, SerializationError> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::with_capacity(bytes.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(|source| SerializationError::InvalidZlib { source })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::igbinary;
    use php_codec::Property;

    fn opts() -> MarshalOptions {
        MarshalOptions::default()
    }

    fn sample_values() -> Vec<Value<'static>> {
        vec![
            Value::Null,
            Value::Bool(true),
            Value::Bool(false),
            Value::Int(0),
            Value::Int(42),
            Value::Int(-7),
            Value::Float(0.0),
            Value::Float(-0.0),
            Value::Float(3.5),
            Value::from("".to_string()),
            Value::from("0".to_string()),
            Value::from("hello world".to_string()),
            Value::from(b"\x00\xff binary".to_vec()),
            Value::Array(vec![]),
            Value::Array(vec![
                (Value::Int(0), Value::from("a".to_string())),
                (Value::from("k".to_string()), Value::Int(9)),
            ]),
            Value::Object {
                class_name: Cow::Borrowed("stdClass"),
                properties: vec![Property::public("id", Value::Int(3))],
            },
        ]
    }

    #[test]
    fn value_map_emits_exact_literals() {
        let table: [(Value, &[u8]); 11] = [
            (Value::Null, b"N;"),
            (Value::Bool(false), b"b:0;"),
            (Value::Bool(true), b"b:1;"),
            (Value::Array(vec![]), b"a:0:{}"),
            (Value::Int(0), b"i:0;"),
            (Value::Int(1), b"i:1;"),
            (Value::Float(0.0), b"d:0;"),
            (Value::Float(-0.0), b"d:-0;"),
            (Value::from(""), b"s:0:\"\";"),
            (Value::from("0"), b"s:1:\"0\";"),
            (Value::from("1"), b"s:1:\"1\";"),
        ];
        for (value, wire) in &table {
            // The map applies regardless of the requested backend
            for serializer in [Serializer::Php, Serializer::Igbinary] {
                let options = MarshalOptions {
                    serializer,
                    ..opts()
                };
                assert_eq!(&serialize(value, &options).unwrap(), wire);
            }
            assert_eq!(&deserialize(wire).unwrap(), value);
        }
    }

    #[test]
    fn negative_zero_sign_survives_the_map() {
        let wire = serialize(&Value::Float(-0.0), &opts()).unwrap();
        assert_eq!(wire, b"d:-0;");
        let back = deserialize(&wire).unwrap();
        assert!(matches!(back, Value::Float(f) if f == 0.0 && f.is_sign_negative()));
    }

    #[test]
    fn round_trip_across_all_parameter_combinations() {
        let encodings = [
            None,
            Some(Encoding::Hex),
            Some(Encoding::Base64),
            Some(Encoding::Base64NoPadding),
            Some(Encoding::Base64Url),
            Some(Encoding::Base64UrlNoPadding),
        ];
        for value in &sample_values() {
            for serializer in [Serializer::Php, Serializer::Igbinary] {
                for encoding in encodings {
                    for with_prefix in [false, true] {
                        for compress in [false, true] {
                            let options = MarshalOptions {
                                encoding,
                                with_prefix,
                                compress,
                                compression_threshold: 8,
                                serializer,
                            };
                            let wire = serialize(value, &options).unwrap();
                            // Value-map literals skip text encoding, so a
                            // forced-encoding decode does not apply to them
                            let in_value_map = value_map_wire(value).is_some();
                            let back = if in_value_map || with_prefix || encoding.is_none() {
                                deserialize(&wire).unwrap()
                            } else {
                                deserialize_with_encoding(&wire, encoding).unwrap()
                            };
                            assert_eq!(&back, value, "opts: {:?}", options);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn compression_respects_the_threshold() {
        let big = Value::from("test".repeat(1000));
        let small = Value::from("test".repeat(10));

        let options = MarshalOptions {
            compress: true,
            ..opts()
        };
        let wire = serialize(&big, &options).unwrap();
        assert_eq!(wire[0], 0x78, "compressible payload over threshold must deflate");
        assert!(wire.len() < 4000);
        assert_eq!(deserialize(&wire).unwrap(), big);

        let wire = serialize(&small, &options).unwrap();
        assert_ne!(wire[0], 0x78);
        assert!(wire.starts_with(b"s:40:"));
    }

    #[test]
    fn threshold_boundary_is_exclusive() {
        // Serialized form of 100 'x' bytes is 109 bytes: s:100:"..." plus quotes
        let value = Value::from("x".repeat(100));
        let raw_len = serialize(&value, &opts()).unwrap().len();

        let at = MarshalOptions {
            compress: true,
            compression_threshold: raw_len,
            ..opts()
        };
        assert!(!has_zlib_header(&serialize(&value, &at).unwrap()));

        let below = MarshalOptions {
            compress: true,
            compression_threshold: raw_len - 1,
            ..opts()
        };
        assert!(has_zlib_header(&serialize(&value, &below).unwrap()));
    }

    #[test]
    fn prefixed_wire_strings_self_describe() {
        let value = Value::from("hello world");
        let options = MarshalOptions {
            encoding: Some(Encoding::Base64),
            with_prefix: true,
            ..opts()
        };
        let wire = serialize(&value, &options).unwrap();
        assert!(wire.starts_with(b"base64:"));
        assert_eq!(deserialize(&wire).unwrap(), value);

        let options = MarshalOptions {
            encoding: Some(Encoding::Hex),
            with_prefix: true,
            ..opts()
        };
        let wire = serialize(&value, &options).unwrap();
        assert!(wire.starts_with(b"hex:"));
        assert_eq!(deserialize(&wire).unwrap(), value);
    }

    #[test]
    fn explicit_encoding_decodes_unprefixed_wire() {
        let value = Value::Int(1234);
        let options = MarshalOptions {
            encoding: Some(Encoding::Base64Url),
            ..opts()
        };
        let wire = serialize(&value, &options).unwrap();
        assert!(Encoding::detect(&wire).is_none());
        assert_eq!(
            deserialize_with_encoding(&wire, Some(Encoding::Base64Url)).unwrap(),
            value
        );
    }

    #[test]
    fn compressed_and_encoded_layers_peel_in_order() {
        let value = Value::from("z".repeat(5000));
        let options = MarshalOptions {
            encoding: Some(Encoding::Base64),
            with_prefix: true,
            compress: true,
            ..opts()
        };
        let wire = serialize(&value, &options).unwrap();
        // base64 of the level-1 zlib header 78 01 starts with "eA"
        assert!(wire.starts_with(b"base64:eA"), "wire: {:?}", &wire[..12]);
        assert_eq!(deserialize(&wire).unwrap(), value);
    }

    #[test]
    fn unsupported_format_is_the_terminal_error() {
        for wire in [&b"xyz"[..], b"invalid:data", b"", b"\x01\x02"] {
            let err = deserialize(wire).unwrap_err();
            assert!(
                matches!(err, SerializationError::UnsupportedFormat),
                "{:?} -> {}",
                wire,
                err
            );
        }
    }

    #[test]
    fn recognized_prefix_with_malformed_body_is_unsupported_format() {
        let err = deserialize(b"base64:!!!not-base64!!!").unwrap_err();
        assert!(matches!(err, SerializationError::UnsupportedFormat));
    }

    #[test]
    fn corrupt_zlib_stream_reports_invalid_zlib() {
        let mut wire = b"\x78\x9c".to_vec();
        wire.extend_from_slice(b"definitely not deflate data");
        let err = deserialize(&wire).unwrap_err();
        assert_eq!(err.to_string(), "invalid zlib string");
    }

    #[test]
    fn corrupt_igbinary_body_commits_to_igbinary() {
        // Valid magic, truncated body: must not fall through to another format
        let wire = [0x00, 0x00, 0x00, 0x02, 0x11, 0x05, b'a', b'b'];
        let err = deserialize(&wire).unwrap_err();
        assert_eq!(err.to_string(), "igbinary serializer: invalid string");
    }

    #[test]
    fn corrupt_php_body_commits_to_php() {
        let err = deserialize(b"s:999:\"invalid").unwrap_err();
        assert_eq!(err.to_string(), "php serializer: invalid string");
    }

    #[test]
    fn igbinary_magic_wins_over_php_lookalike_tail() {
        let mut wire = igbinary::HEADER.to_vec();
        wire.extend_from_slice(b"i:0;");
        let err = deserialize(&wire).unwrap_err();
        assert_eq!(err.to_string(), "igbinary serializer: invalid string");
    }
}
