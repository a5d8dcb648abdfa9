//! igbinary v2 binary codec for the supported value kinds.
//!
//! The fast backend. Output starts with the 4-byte version header
//! `00 00 00 02` that format sniffing keys on, followed by tagged,
//! big-endian entries. Repeated strings (including array keys and
//! property names) are written once and back-referenced through a
//! string table, which is what makes this format compact.
//!
//! Layout per entry: one tag byte, then a width-sized big-endian length
//! or magnitude, then raw bytes where applicable. Integers pick the
//! smallest width that fits their magnitude, with separate tags for
//! negative values. Objects are a class-name string followed by an
//! array-shaped property list with mangled names.

use std::borrow::Cow;
use std::collections::HashMap;

use thiserror::Error;

use php_codec::{Property, Value};

/// Version header every igbinary payload starts with.
pub const HEADER: [u8; 4] = [0x00, 0x00, 0x00, 0x02];

/// Maximum nesting depth for the decoder, matching the portable parser.
const MAX_DEPTH: usize = 512;

mod tag {
    pub const NULL: u8 = 0x00;
    pub const BOOL_FALSE: u8 = 0x04;
    pub const BOOL_TRUE: u8 = 0x05;
    pub const LONG8P: u8 = 0x06;
    pub const LONG8N: u8 = 0x07;
    pub const LONG16P: u8 = 0x08;
    pub const LONG16N: u8 = 0x09;
    pub const LONG32P: u8 = 0x0a;
    pub const LONG32N: u8 = 0x0b;
    pub const DOUBLE: u8 = 0x0c;
    pub const STRING_EMPTY: u8 = 0x0d;
    pub const STRING_ID8: u8 = 0x0e;
    pub const STRING_ID16: u8 = 0x0f;
    pub const STRING_ID32: u8 = 0x10;
    pub const STRING8: u8 = 0x11;
    pub const STRING16: u8 = 0x12;
    pub const STRING32: u8 = 0x13;
    pub const ARRAY8: u8 = 0x14;
    pub const ARRAY16: u8 = 0x15;
    pub const ARRAY32: u8 = 0x16;
    pub const OBJECT8: u8 = 0x17;
    pub const OBJECT16: u8 = 0x18;
    pub const OBJECT32: u8 = 0x19;
    pub const LONG64P: u8 = 0x20;
    pub const LONG64N: u8 = 0x21;
}

/// Errors from the igbinary codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IgbinaryError {
    /// Payload does not start with the version header.
    #[error("missing or unsupported igbinary header")]
    BadHeader,

    /// Input ended inside an entry.
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEof(usize),

    /// Unknown tag byte.
    #[error("unknown type tag 0x{0:02x} at byte {1}")]
    UnknownTag(u8, usize),

    /// A string back-reference pointed outside the string table.
    #[error("string id {0} out of range")]
    BadStringId(usize),

    /// A 64-bit magnitude does not fit a signed integer.
    #[error("integer magnitude out of range")]
    OutOfRange,

    /// Array key was not an integer or string.
    #[error("invalid array key type")]
    InvalidKey,

    /// A class name was not valid UTF-8.
    #[error("class name is not valid UTF-8")]
    InvalidClassName,

    /// String or collection exceeds the 32-bit length limit.
    #[error("{0} exceeds the 32-bit length limit")]
    TooLong(&'static str),

    /// Nesting depth exceeded.
    #[error("maximum nesting depth ({0}) exceeded")]
    MaxDepthExceeded(usize),
}

/// Serialize a value to igbinary bytes.
pub fn to_vec(value: &Value) -> Result<Vec<u8>, IgbinaryError> {
    let mut encoder = Encoder {
        out: HEADER.to_vec(),
        strings: HashMap::new(),
    };
    encoder.write_value(value)?;
    Ok(encoder.out)
}

/// Deserialize igbinary bytes to an owned value.
pub fn from_bytes(data: &[u8]) -> Result<Value<'static>, IgbinaryError> {
    if !data.starts_with(&HEADER) {
        return Err(IgbinaryError::BadHeader);
    }
    let mut decoder = Decoder {
        data,
        pos: HEADER.len(),
        strings: Vec::new(),
        depth: 0,
    };
    decoder.read_value()
}

struct Encoder {
    out: Vec<u8>,
    /// First-occurrence index of every emitted string.
    strings: HashMap<Vec<u8>, usize>,
}

impl Encoder {
    fn write_value(&mut self, value: &Value) -> Result<(), IgbinaryError> {
        match value {
            Value::Null => self.out.push(tag::NULL),
            Value::Bool(false) => self.out.push(tag::BOOL_FALSE),
            Value::Bool(true) => self.out.push(tag::BOOL_TRUE),
            Value::Int(i) => self.write_long(*i),
            Value::Float(f) => {
                self.out.push(tag::DOUBLE);
                self.out.extend_from_slice(&f.to_bits().to_be_bytes());
            }
            Value::String(s) => self.write_string(s)?,
            Value::Array(items) => {
                self.write_sized(tag::ARRAY8, tag::ARRAY16, tag::ARRAY32, items.len(), "array")?;
                for (key, value) in items {
                    self.write_key(key)?;
                    self.write_value(value)?;
                }
            }
            Value::Object {
                class_name,
                properties,
            } => {
                self.write_sized(
                    tag::OBJECT8,
                    tag::OBJECT16,
                    tag::OBJECT32,
                    properties.len(),
                    "object",
                )?;
                self.write_string(class_name.as_bytes())?;
                for prop in properties {
                    self.write_string(&prop.wire_name())?;
                    self.write_value(&prop.value)?;
                }
            }
        }
        Ok(())
    }

    fn write_key(&mut self, key: &Value) -> Result<(), IgbinaryError> {
        match key {
            Value::Int(i) => {
                self.write_long(*i);
                Ok(())
            }
            Value::String(s) => self.write_string(s),
            _ => Err(IgbinaryError::InvalidKey),
        }
    }

    fn write_long(&mut self, value: i64) {
        let (magnitude, base_offset) = if value < 0 {
            (value.unsigned_abs(), 1u8)
        } else {
            (value as u64, 0u8)
        };
        if magnitude <= u64::from(u8::MAX) {
            self.out.push(tag::LONG8P + base_offset);
            self.out.push(magnitude as u8);
        } else if magnitude <= u64::from(u16::MAX) {
            self.out.push(tag::LONG16P + base_offset);
            self.out.extend_from_slice(&(magnitude as u16).to_be_bytes());
        } else if magnitude <= u64::from(u32::MAX) {
            self.out.push(tag::LONG32P + base_offset);
            self.out.extend_from_slice(&(magnitude as u32).to_be_bytes());
        } else {
            self.out.push(tag::LONG64P + base_offset);
            self.out.extend_from_slice(&magnitude.to_be_bytes());
        }
    }

    fn write_string(&mut self, bytes: &[u8]) -> Result<(), IgbinaryError> {
        if bytes.is_empty() {
            self.out.push(tag::STRING_EMPTY);
            return Ok(());
        }
        if let Some(&id) = self.strings.get(bytes) {
            self.write_sized(tag::STRING_ID8, tag::STRING_ID16, tag::STRING_ID32, id, "string table")?;
            return Ok(());
        }
        let id = self.strings.len();
        self.strings.insert(bytes.to_vec(), id);
        self.write_sized(tag::STRING8, tag::STRING16, tag::STRING32, bytes.len(), "string")?;
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    /// Emit one of three width-variant tags followed by `n` big-endian.
    fn write_sized(
        &mut self,
        tag8: u8,
        tag16: u8,
        tag32: u8,
        n: usize,
        what: &'static str,
    ) -> Result<(), IgbinaryError> {
        if n <= usize::from(u8::MAX) {
            self.out.push(tag8);
            self.out.push(n as u8);
        } else if n <= usize::from(u16::MAX) {
            self.out.push(tag16);
            self.out.extend_from_slice(&(n as u16).to_be_bytes());
        } else if u32::try_from(n).is_ok() {
            self.out.push(tag32);
            self.out.extend_from_slice(&(n as u32).to_be_bytes());
        } else {
            return Err(IgbinaryError::TooLong(what));
        }
        Ok(())
    }
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    /// Strings in first-occurrence order, indexed by back-references.
    strings: Vec<Vec<u8>>,
    depth: usize,
}

impl Decoder<'_> {
    fn read_value(&mut self) -> Result<Value<'static>, IgbinaryError> {
        if self.depth > MAX_DEPTH {
            return Err(IgbinaryError::MaxDepthExceeded(MAX_DEPTH));
        }

        let tag_pos = self.pos;
        let tag_byte = self.read_u8()?;
        match tag_byte {
            tag::NULL => Ok(Value::Null),
            tag::BOOL_FALSE => Ok(Value::Bool(false)),
            tag::BOOL_TRUE => Ok(Value::Bool(true)),
            tag::LONG8P => Ok(Value::Int(i64::from(self.read_u8()?))),
            tag::LONG8N => Ok(Value::Int(-i64::from(self.read_u8()?))),
            tag::LONG16P => Ok(Value::Int(i64::from(self.read_u16()?))),
            tag::LONG16N => Ok(Value::Int(-i64::from(self.read_u16()?))),
            tag::LONG32P => Ok(Value::Int(i64::from(self.read_u32()?))),
            tag::LONG32N => Ok(Value::Int(-i64::from(self.read_u32()?))),
            tag::LONG64P => {
                let magnitude = self.read_u64()?;
                i64::try_from(magnitude)
                    .map(Value::Int)
                    .map_err(|_| IgbinaryError::OutOfRange)
            }
            tag::LONG64N => {
                let magnitude = self.read_u64()?;
                if magnitude == i64::MIN.unsigned_abs() {
                    Ok(Value::Int(i64::MIN))
                } else {
                    i64::try_from(magnitude)
                        .map(|m| Value::Int(-m))
                        .map_err(|_| IgbinaryError::OutOfRange)
                }
            }
            tag::DOUBLE => {
                let bits = self.read_u64()?;
                Ok(Value::Float(f64::from_bits(bits)))
            }
            tag::STRING_EMPTY
            | tag::STRING8
            | tag::STRING16
            | tag::STRING32
            | tag::STRING_ID8
            | tag::STRING_ID16
            | tag::STRING_ID32 => {
                let bytes = self.read_string_body(tag_byte)?;
                Ok(Value::String(Cow::Owned(bytes)))
            }
            tag::ARRAY8 | tag::ARRAY16 | tag::ARRAY32 => {
                let count = self.read_width(tag_byte - tag::ARRAY8)?;
                self.depth += 1;
                let mut items = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let key = self.read_key()?;
                    let value = self.read_value()?;
                    items.push((key, value));
                }
                self.depth -= 1;
                Ok(Value::Array(items))
            }
            tag::OBJECT8 | tag::OBJECT16 | tag::OBJECT32 => {
                let count = self.read_width(tag_byte - tag::OBJECT8)?;
                let class_bytes = self.read_string()?;
                let class_name = String::from_utf8(class_bytes)
                    .map_err(|_| IgbinaryError::InvalidClassName)?;
                self.depth += 1;
                let mut properties = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    let name = self.read_string()?;
                    let value = self.read_value()?;
                    properties.push(Property::from_wire_name(&name, value));
                }
                self.depth -= 1;
                Ok(Value::Object {
                    class_name: Cow::Owned(class_name),
                    properties,
                })
            }
            other => Err(IgbinaryError::UnknownTag(other, tag_pos)),
        }
    }

    fn read_key(&mut self) -> Result<Value<'static>, IgbinaryError> {
        let key = self.read_value()?;
        match key {
            Value::Int(_) | Value::String(_) => Ok(key),
            _ => Err(IgbinaryError::InvalidKey),
        }
    }

    /// Read a full string entry (any string tag) at the current position.
    fn read_string(&mut self) -> Result<Vec<u8>, IgbinaryError> {
        let tag_pos = self.pos;
        let tag_byte = self.read_u8()?;
        match tag_byte {
            tag::STRING_EMPTY
            | tag::STRING8
            | tag::STRING16
            | tag::STRING32
            | tag::STRING_ID8
            | tag::STRING_ID16
            | tag::STRING_ID32 => self.read_string_body(tag_byte),
            other => Err(IgbinaryError::UnknownTag(other, tag_pos)),
        }
    }

    /// Read a string body after its tag, maintaining the string table.
    fn read_string_body(&mut self, tag_byte: u8) -> Result<Vec<u8>, IgbinaryError> {
        match tag_byte {
            tag::STRING_EMPTY => Ok(Vec::new()),
            tag::STRING8 | tag::STRING16 | tag::STRING32 => {
                let len = self.read_width(tag_byte - tag::STRING8)?;
                let bytes = self.read_bytes(len)?.to_vec();
                self.strings.push(bytes.clone());
                Ok(bytes)
            }
            // STRING_ID8/16/32
            _ => {
                let id = self.read_width(tag_byte - tag::STRING_ID8)?;
                self.strings
                    .get(id)
                    .cloned()
                    .ok_or(IgbinaryError::BadStringId(id))
            }
        }
    }

    /// Read a big-endian unsigned field whose width is selected by the tag
    /// offset (0 = u8, 1 = u16, 2 = u32).
    fn read_width(&mut self, width: u8) -> Result<usize, IgbinaryError> {
        match width {
            0 => Ok(usize::from(self.read_u8()?)),
            1 => Ok(usize::from(self.read_u16()?)),
            _ => Ok(self.read_u32()? as usize),
        }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&[u8], IgbinaryError> {
        if self.pos + len > self.data.len() {
            return Err(IgbinaryError::UnexpectedEof(self.pos));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8, IgbinaryError> {
        let byte = self
            .data
            .get(self.pos)
            .copied()
            .ok_or(IgbinaryError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, IgbinaryError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, IgbinaryError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, IgbinaryError> {
        let bytes = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use php_codec::Visibility;

    fn round_trip(value: &Value) -> Value<'static> {
        let wire = to_vec(value).unwrap();
        assert!(wire.starts_with(&HEADER), "missing header: {:?}", wire);
        from_bytes(&wire).unwrap()
    }

    #[test]
    fn scalars_round_trip() {
        for v in [
            Value::Null,
            Value::Bool(false),
            Value::Bool(true),
            Value::Int(0),
            Value::Int(255),
            Value::Int(256),
            Value::Int(-1),
            Value::Int(65536),
            Value::Int(i64::MAX),
            Value::Int(i64::MIN),
            Value::Float(0.0),
            Value::Float(-2.5),
            Value::Float(1e300),
            Value::from(""),
            Value::from("hello"),
            Value::from(&b"\x00\xff\xfe"[..]),
        ] {
            assert_eq!(round_trip(&v), v);
        }
    }

    #[test]
    fn negative_zero_survives_bit_exact() {
        let v = round_trip(&Value::Float(-0.0));
        assert!(matches!(v, Value::Float(f) if f == 0.0 && f.is_sign_negative()));
    }

    #[test]
    fn long_width_selection() {
        // 255 fits in one byte, 256 needs two
        assert_eq!(to_vec(&Value::Int(255)).unwrap()[4], tag::LONG8P);
        assert_eq!(to_vec(&Value::Int(256)).unwrap()[4], tag::LONG16P);
        assert_eq!(to_vec(&Value::Int(-256)).unwrap()[4], tag::LONG16N);
        assert_eq!(to_vec(&Value::Int(1 << 40)).unwrap()[4], tag::LONG64P);
    }

    #[test]
    fn repeated_strings_use_the_table() {
        let v = Value::Array(vec![
            (Value::Int(0), Value::from("repeat")),
            (Value::Int(1), Value::from("repeat")),
            (Value::Int(2), Value::from("repeat")),
        ]);
        let wire = to_vec(&v).unwrap();
        // "repeat" appears once; later occurrences are 2-byte id refs
        let needle = b"repeat";
        let occurrences = wire
            .windows(needle.len())
            .filter(|w| w == needle)
            .count();
        assert_eq!(occurrences, 1);
        assert_eq!(from_bytes(&wire).unwrap(), v);
    }

    #[test]
    fn arrays_and_objects_round_trip() {
        let v = Value::Array(vec![
            (Value::from("nested"), Value::Array(vec![(Value::Int(0), Value::Null)])),
            (
                Value::Int(7),
                Value::Object {
                    class_name: Cow::Borrowed("Vault"),
                    properties: vec![
                        Property::public("name", Value::from("Alice")),
                        Property {
                            name: Cow::Borrowed("key"),
                            visibility: Visibility::Private,
                            declaring_class: Some(Cow::Borrowed("Vault")),
                            value: Value::from("s3cr3t"),
                        },
                        Property {
                            name: Cow::Borrowed("state"),
                            visibility: Visibility::Protected,
                            declaring_class: None,
                            value: Value::Int(2),
                        },
                    ],
                },
            ),
        ]);
        assert_eq!(round_trip(&v), v.clone().into_owned());
    }

    #[test]
    fn header_is_the_sniffable_magic() {
        assert_eq!(HEADER, [0x00, 0x00, 0x00, 0x02]);
        assert_eq!(&to_vec(&Value::Null).unwrap()[..4], &HEADER);
    }

    #[test]
    fn bad_header_is_rejected() {
        assert_eq!(from_bytes(b"\x00\x00\x00\x01\x00"), Err(IgbinaryError::BadHeader));
        assert_eq!(from_bytes(b""), Err(IgbinaryError::BadHeader));
    }

    #[test]
    fn truncated_payload_fails() {
        let mut wire = to_vec(&Value::from("hello world")).unwrap();
        wire.truncate(wire.len() - 3);
        assert!(matches!(
            from_bytes(&wire),
            Err(IgbinaryError::UnexpectedEof(_))
        ));
    }

    #[test]
    fn unknown_tag_fails_with_position() {
        let wire = [0x00, 0x00, 0x00, 0x02, 0x7f];
        assert_eq!(from_bytes(&wire), Err(IgbinaryError::UnknownTag(0x7f, 4)));
    }

    #[test]
    fn dangling_string_id_fails() {
        let wire = [0x00, 0x00, 0x00, 0x02, tag::STRING_ID8, 0x03];
        assert_eq!(from_bytes(&wire), Err(IgbinaryError::BadStringId(3)));
    }
}
