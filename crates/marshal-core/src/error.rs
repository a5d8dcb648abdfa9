//! Error taxonomy for the serialization envelope.

use thiserror::Error;

use crate::igbinary::IgbinaryError;
use php_codec::PhpParseError;

/// A serialize or deserialize operation failed.
///
/// Every malformed-wire condition surfaces through this type with a
/// message naming the stage that rejected the data. Once a format header
/// has been recognized, that decoder's failure is surfaced as-is; there
/// is no fallthrough to another format.
#[derive(Error, Debug)]
pub enum SerializationError {
    /// A zlib header was recognized but the stream did not inflate.
    #[error("invalid zlib string")]
    InvalidZlib {
        /// The underlying inflate failure.
        #[source]
        source: std::io::Error,
    },

    /// The igbinary header was recognized but the body did not decode.
    #[error("igbinary serializer: invalid string")]
    Igbinary {
        /// The underlying codec failure.
        #[source]
        source: IgbinaryError,
    },

    /// PHP serialize syntax was recognized but the body did not parse.
    #[error("php serializer: invalid string")]
    Php {
        /// The underlying parse failure.
        #[source]
        source: PhpParseError,
    },

    /// The payload matches no known serialization format.
    #[error("unsupported serialization format")]
    UnsupportedFormat,

    /// A value exceeds a backend's representable size.
    #[error("igbinary serializer: {source}")]
    TooLarge {
        /// The length-limit failure from the encoder.
        #[source]
        source: IgbinaryError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_wire_contract() {
        let err = SerializationError::UnsupportedFormat;
        assert_eq!(err.to_string(), "unsupported serialization format");

        let err = SerializationError::Igbinary {
            source: IgbinaryError::BadHeader,
        };
        assert_eq!(err.to_string(), "igbinary serializer: invalid string");

        let err = SerializationError::Php {
            source: PhpParseError::new(php_codec::ErrorKind::UnexpectedEof, 0),
        };
        assert_eq!(err.to_string(), "php serializer: invalid string");
    }
}
