//! PHP serialize wire codec: strict parser and byte-exact writer.
//!
//! This crate implements PHP's `serialize()` wire syntax as a standalone,
//! byte-exact codec over a closed [`Value`] sum type. It is the portable
//! serializer backend of the `marshal-core` envelope, but stands on its own
//! for reading and producing PHP serialized data.
//!
//! # Features
//!
//! - **Both directions** - strict zero-copy parsing and byte-exact writing
//! - **Full visibility handling** - private/protected property-name mangling
//! - **Binary safe** - strings are length-prefixed byte strings, not UTF-8
//! - **Detailed errors** - precise error positions and input previews
//!
//! # Quick Start
//!
//! ```rust
//! use php_codec::{from_bytes, to_vec, Value};
//!
//! let data = br#"a:2:{s:4:"name";s:5:"Alice";s:3:"age";i:30;}"#;
//! let value = from_bytes(data).unwrap();
//! assert_eq!(to_vec(&value), data);
//! ```
//!
//! # Supported Types
//!
//! | Wire Type | Rust Type |
//! |-----------|-----------|
//! | `null` | `Value::Null` |
//! | `bool` | `Value::Bool(bool)` |
//! | `int` | `Value::Int(i64)` |
//! | `float` | `Value::Float(f64)` |
//! | `string` | `Value::String(Cow<[u8]>)` |
//! | `array` | `Value::Array(Vec<(Value, Value)>)` |
//! | `object` | `Value::Object { class_name, properties }` |
//!
//! PHP references (`R`/`r`), custom objects (`C`) and enums (`E`) are
//! outside the supported kinds and fail as unknown type markers.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)]

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

#[cfg(feature = "serde")]
pub mod json;

pub use error::{ErrorKind, PhpParseError, Result};
pub use parser::{from_bytes, from_bytes_with_config, Parser, ParserConfig};
pub use types::{Property, Value, Visibility};
pub use writer::to_vec;

#[cfg(feature = "serde")]
pub use json::to_json;
