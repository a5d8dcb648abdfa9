//! Self-describing serialization envelope.
//!
//! `marshal-core` serializes values through a pluggable backend (PHP
//! serialize syntax or igbinary), optionally compresses large payloads
//! with zlib, and optionally text-encodes the result under a
//! constant-time codec. Deserialization takes no parameters: every
//! layer announces itself in its leading bytes (encoding prefix, zlib
//! header, igbinary magic, PHP type tags) and is peeled in order.
//!
//! # Quick Start
//!
//! ```rust
//! use marshal_core::{deserialize, serialize, Encoding, MarshalOptions, Value};
//!
//! let options = MarshalOptions {
//!     encoding: Some(Encoding::Base64),
//!     with_prefix: true,
//!     ..Default::default()
//! };
//! let wire = serialize(&Value::from("hello world"), &options).unwrap();
//! assert!(wire.starts_with(b"base64:"));
//! assert_eq!(deserialize(&wire).unwrap(), Value::from("hello world"));
//! ```
//!
//! # Wire format
//!
//! Outer to inner:
//!
//! 1. Optional encoding prefix (`hex:`, `base64:`, `base64url:`) and
//!    encoded payload, or raw payload.
//! 2. Optional zlib stream (headers `78 01`, `78 5E`, `78 9C`, `78 DA`).
//! 3. A value-map literal for trivial values, or backend output
//!    (igbinary magic `00 00 00 02`, or PHP serialize syntax).
//!
//! These bytes are an interoperability contract: data written by one
//! process must be readable by another implementation of the same
//! format.
//!
//! # Secrets
//!
//! [`ct::equals`] and [`ct::starts_with`] compare byte strings in time
//! independent of where they first differ. Use them instead of `==`
//! whenever one side is secret.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]

pub mod ct;
pub mod encoding;
pub mod error;
pub mod igbinary;
pub mod marshaller;
pub mod serializer;

pub use ct::InvalidEncodedString;
pub use encoding::Encoding;
pub use error::SerializationError;
pub use marshaller::{
    deserialize, deserialize_with_encoding, serialize, MarshalOptions,
    DEFAULT_COMPRESSION_THRESHOLD,
};
pub use serializer::{Serializer, UnknownSerializer};

pub use php_codec::{Property, Value, Visibility};
