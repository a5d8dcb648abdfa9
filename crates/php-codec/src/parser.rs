//! Strict parser for PHP's serialize wire syntax.
//!
//! The parser is byte-exact: declared string lengths must match, every
//! terminator must be present, and unknown type markers fail. Tolerant
//! recovery has no place here because the bytes are an interoperability
//! contract consumed by format sniffers upstream.
//!
//! # Performance Characteristics
//!
//! - **Zero-copy strings**: Borrows directly from input when possible
//! - **SIMD-accelerated search**: Uses `memchr` for delimiter scanning
//! - **Inline hot paths**: Critical functions are marked for inlining

use std::borrow::Cow;

use memchr::memchr;

#[cfg(feature = "tracing")]
use tracing::{debug, trace, warn};

use crate::error::{ErrorKind, PhpParseError, Result};
use crate::types::{Property, Value};

/// Maximum nesting depth to prevent stack overflow.
const MAX_DEPTH: usize = 512;

/// Parser configuration options.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum nesting depth for arrays and objects.
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
        }
    }
}

/// A zero-copy parser for PHP serialized bytes.
pub struct Parser<'a> {
    /// Input data.
    data: &'a [u8],
    /// Current position in the input.
    pos: usize,
    /// Parser configuration.
    config: ParserConfig,
    /// Current nesting depth.
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser with default configuration.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_config(data, ParserConfig::default())
    }

    /// Create a new parser with custom configuration.
    pub fn with_config(data: &'a [u8], config: ParserConfig) -> Self {
        Self {
            data,
            pos: 0,
            config,
            depth: 0,
        }
    }

    /// Parse the input and return a value.
    pub fn parse(&mut self) -> Result<Value<'a>> {
        #[cfg(feature = "tracing")]
        debug!(data_len = self.data.len(), "parsing PHP serialized bytes");

        let result = self.parse_value();

        #[cfg(feature = "tracing")]
        match &result {
            Ok(value) => debug!(value_type = value.type_name(), "parse completed"),
            Err(e) => warn!(error = %e, "parse failed"),
        }

        result
    }

    /// Parse a single value at the current position.
    ///
    /// This is the core dispatch routing to type-specific parsers.
    fn parse_value(&mut self) -> Result<Value<'a>> {
        if self.depth > self.config.max_depth {
            return Err(PhpParseError::new(
                ErrorKind::MaxDepthExceeded(self.config.max_depth),
                self.pos,
            ));
        }

        let type_byte = self.peek_byte()?;

        #[cfg(feature = "tracing")]
        trace!(type_marker = %char::from(type_byte), pos = self.pos, "parsing value");

        match type_byte {
            b'N' => self.parse_null(),
            b'b' => self.parse_bool(),
            b'i' => self.parse_int(),
            b'd' => self.parse_float(),
            b's' => self.parse_string(),
            b'a' => self.parse_array(),
            b'O' => self.parse_object(),
            _ => Err(PhpParseError::new(
                ErrorKind::UnknownType(type_byte as char),
                self.pos,
            )
            .with_input_preview(self.data, self.pos)),
        }
    }

    /// Parse a null value: `N;`
    fn parse_null(&mut self) -> Result<Value<'a>> {
        self.expect_byte(b'N')?;
        self.expect_byte(b';')?;
        Ok(Value::Null)
    }

    /// Parse a boolean value: `b:0;` or `b:1;`
    fn parse_bool(&mut self) -> Result<Value<'a>> {
        self.expect_byte(b'b')?;
        self.expect_byte(b':')?;
        let value_byte = self.read_byte()?;
        self.expect_byte(b';')?;

        match value_byte {
            b'0' => Ok(Value::Bool(false)),
            b'1' => Ok(Value::Bool(true)),
            _ => Err(PhpParseError::new(
                ErrorKind::InvalidBoolean((value_byte as char).to_string()),
                self.pos - 2,
            )),
        }
    }

    /// Parse an integer value: `i:<value>;`
    fn parse_int(&mut self) -> Result<Value<'a>> {
        self.expect_byte(b'i')?;
        self.expect_byte(b':')?;

        let start = self.pos;
        let value = self.read_until(b';')?;

        let int_str = std::str::from_utf8(value).map_err(|_| {
            PhpParseError::new(ErrorKind::InvalidInteger("invalid UTF-8".into()), start)
        })?;

        let int_value: i64 = int_str.parse().map_err(|_| {
            PhpParseError::new(ErrorKind::InvalidInteger(int_str.to_string()), start)
        })?;

        self.expect_byte(b';')?;
        Ok(Value::Int(int_value))
    }

    /// Parse a float value: `d:<value>;`
    fn parse_float(&mut self) -> Result<Value<'a>> {
        self.expect_byte(b'd')?;
        self.expect_byte(b':')?;

        let start = self.pos;
        let value = self.read_until(b';')?;

        let float_str = std::str::from_utf8(value).map_err(|_| {
            PhpParseError::new(ErrorKind::InvalidFloat("invalid UTF-8".into()), start)
        })?;

        // PHP spells the non-finite values out
        let float_value: f64 = match float_str {
            "INF" => f64::INFINITY,
            "-INF" => f64::NEG_INFINITY,
            "NAN" => f64::NAN,
            _ => float_str.parse().map_err(|_| {
                PhpParseError::new(ErrorKind::InvalidFloat(float_str.to_string()), start)
            })?,
        };

        self.expect_byte(b';')?;
        Ok(Value::Float(float_value))
    }

    /// Parse a string value: `s:<len>:"<data>";`
    fn parse_string(&mut self) -> Result<Value<'a>> {
        self.expect_byte(b's')?;
        self.expect_byte(b':')?;

        let len = self.read_length(b':')?;
        self.expect_byte(b':')?;
        self.expect_byte(b'"')?;

        let string_start = self.pos;
        if self.pos + len > self.data.len() {
            return Err(PhpParseError::new(
                ErrorKind::StringLengthMismatch {
                    expected: len,
                    found: self.data.len() - self.pos,
                },
                string_start,
            ));
        }

        let string_data = &self.data[self.pos..self.pos + len];
        self.pos += len;
        self.expect_byte(b'"')?;
        self.expect_byte(b';')?;
        Ok(Value::String(Cow::Borrowed(string_data)))
    }

    /// Parse an array value: `a:<count>:{<key><value>...}`
    fn parse_array(&mut self) -> Result<Value<'a>> {
        self.expect_byte(b'a')?;
        self.expect_byte(b':')?;

        let count = self.read_length(b':')?;
        self.expect_byte(b':')?;
        self.expect_byte(b'{')?;

        self.depth += 1;
        let mut items = Vec::with_capacity(count.min(1024)); // Cap initial allocation

        for _ in 0..count {
            let key = self.parse_value()?;

            match &key {
                Value::String(_) | Value::Int(_) => {}
                _ => {
                    return Err(PhpParseError::new(ErrorKind::InvalidArrayKey, self.pos));
                }
            }

            let value = self.parse_value()?;
            items.push((key, value));
        }

        self.depth -= 1;
        self.expect_byte(b'}')?;

        Ok(Value::Array(items))
    }

    /// Parse an object value: `O:<namelen>:"<name>":<count>:{<prop>...}`
    fn parse_object(&mut self) -> Result<Value<'a>> {
        self.expect_byte(b'O')?;
        self.expect_byte(b':')?;

        let name_len = self.read_length(b':')?;
        self.expect_byte(b':')?;
        self.expect_byte(b'"')?;

        if self.pos + name_len > self.data.len() {
            return Err(PhpParseError::new(ErrorKind::UnexpectedEof, self.pos));
        }
        let class_name_bytes = &self.data[self.pos..self.pos + name_len];
        let class_name = std::str::from_utf8(class_name_bytes)
            .map_err(|_| PhpParseError::new(ErrorKind::InvalidUtf8, self.pos))?;
        self.pos += name_len;

        self.expect_byte(b'"')?;
        self.expect_byte(b':')?;

        let count = self.read_length(b':')?;
        self.expect_byte(b':')?;
        self.expect_byte(b'{')?;

        self.depth += 1;
        let mut properties = Vec::with_capacity(count.min(1024));

        for _ in 0..count {
            let prop = self.parse_property()?;
            properties.push(prop);
        }

        self.depth -= 1;
        self.expect_byte(b'}')?;

        Ok(Value::Object {
            class_name: Cow::Borrowed(class_name),
            properties,
        })
    }

    /// Parse an object property, demangling visibility from its name.
    fn parse_property(&mut self) -> Result<Property<'a>> {
        let name_value = self.parse_value()?;
        let name_bytes = match &name_value {
            Value::String(s) => s.as_ref(),
            _ => {
                return Err(PhpParseError::new(ErrorKind::InvalidArrayKey, self.pos));
            }
        };

        let name_bytes = name_bytes.to_vec();
        let value = self.parse_value()?;
        Ok(Property::from_wire_name(&name_bytes, value))
    }

    // Helper methods - marked #[inline] for performance on hot paths

    /// Read an unsigned decimal length field terminated by `delimiter`.
    #[inline]
    fn read_length(&mut self, delimiter: u8) -> Result<usize> {
        let start = self.pos;
        let bytes = self.read_until(delimiter)?;
        let s = std::str::from_utf8(bytes).map_err(|_| {
            PhpParseError::new(ErrorKind::InvalidInteger("invalid UTF-8".into()), start)
        })?;
        s.parse()
            .map_err(|_| PhpParseError::new(ErrorKind::InvalidInteger(s.to_string()), start))
    }

    /// Peek at the current byte without consuming it.
    #[inline(always)]
    fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| PhpParseError::new(ErrorKind::UnexpectedEof, self.pos))
    }

    /// Read and consume the current byte.
    #[inline(always)]
    fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    /// Expect a specific byte, returning an error if it doesn't match.
    #[inline]
    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        let byte = self.read_byte()?;
        if byte != expected {
            return Err(self.make_unexpected_char_error(expected, byte));
        }
        Ok(())
    }

    /// Create an unexpected character error with proper context.
    #[cold]
    #[inline(never)]
    fn make_unexpected_char_error(&self, expected: u8, found: u8) -> PhpParseError {
        PhpParseError::new(
            ErrorKind::UnexpectedChar {
                expected: expected as char,
                found: found as char,
            },
            self.pos - 1,
        )
        .with_input_preview(self.data, self.pos.saturating_sub(1))
    }

    /// Read bytes until the delimiter, using SIMD-accelerated search.
    #[inline]
    fn read_until(&mut self, delimiter: u8) -> Result<&'a [u8]> {
        let start = self.pos;
        match memchr(delimiter, &self.data[start..]) {
            Some(offset) => {
                let result = &self.data[start..start + offset];
                self.pos = start + offset;
                Ok(result)
            }
            None => Err(self.make_delimiter_not_found_error(delimiter)),
        }
    }

    /// Create a delimiter not found error with proper context.
    #[cold]
    #[inline(never)]
    fn make_delimiter_not_found_error(&self, delimiter: u8) -> PhpParseError {
        PhpParseError::new(
            ErrorKind::UnexpectedChar {
                expected: delimiter as char,
                found: if self.pos < self.data.len() {
                    self.data[self.pos] as char
                } else {
                    '\0'
                },
            },
            self.pos,
        )
        .with_input_preview(self.data, self.pos)
    }
}

/// Parse PHP serialized bytes.
///
/// # Example
///
/// ```rust
/// use php_codec::from_bytes;
///
/// let value = from_bytes(b"i:42;").unwrap();
/// assert_eq!(value.as_int(), Some(42));
/// ```
#[inline]
pub fn from_bytes(data: &[u8]) -> Result<Value<'_>> {
    let mut parser = Parser::new(data);
    parser.parse()
}

/// Parse PHP serialized bytes with custom configuration.
///
/// # Example
///
/// ```rust
/// use php_codec::{from_bytes_with_config, ParserConfig};
///
/// let config = ParserConfig { max_depth: 64 };
/// let value = from_bytes_with_config(b"i:42;", config).unwrap();
/// ```
#[inline]
pub fn from_bytes_with_config(data: &[u8], config: ParserConfig) -> Result<Value<'_>> {
    let mut parser = Parser::with_config(data, config);
    parser.parse()
}
