//! Supported text encodings.
//!
//! Each variant carries a canonical self-describing prefix and a validation
//! pattern over its alphabet. The padded and unpadded base64 variants share
//! a prefix, so decoders must tolerate either form; see [`crate::ct`].

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref HEX_RE: Regex = Regex::new("^[0-9a-fA-F]*$").unwrap();
    static ref BASE64_RE: Regex = Regex::new("^[A-Za-z0-9+/]*={0,2}$").unwrap();
    static ref BASE64_NO_PAD_RE: Regex = Regex::new("^[A-Za-z0-9+/]*$").unwrap();
    static ref BASE64_URL_RE: Regex = Regex::new("^[A-Za-z0-9_-]*={0,2}$").unwrap();
    static ref BASE64_URL_NO_PAD_RE: Regex = Regex::new("^[A-Za-z0-9_-]*$").unwrap();
}

/// A text encoding over raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Lowercase RFC 4648 hex.
    Hex,
    /// Standard base64 alphabet, `=` padded.
    Base64,
    /// Standard base64 alphabet, unpadded.
    Base64NoPadding,
    /// URL-safe base64 alphabet, `=` padded.
    Base64Url,
    /// URL-safe base64 alphabet, unpadded.
    Base64UrlNoPadding,
}

impl Encoding {
    /// The self-describing prefix for this encoding.
    ///
    /// Padding variants are indistinguishable by prefix; decoding is
    /// tolerant of either form.
    pub const fn prefix(self) -> &'static str {
        match self {
            Encoding::Hex => "hex:",
            Encoding::Base64 | Encoding::Base64NoPadding => "base64:",
            Encoding::Base64Url | Encoding::Base64UrlNoPadding => "base64url:",
        }
    }

    /// Validation pattern for this encoding's alphabet, applied after
    /// prefix stripping in strict decoding.
    pub fn regex(self) -> &'static Regex {
        match self {
            Encoding::Hex => &HEX_RE,
            Encoding::Base64 => &BASE64_RE,
            Encoding::Base64NoPadding => &BASE64_NO_PAD_RE,
            Encoding::Base64Url => &BASE64_URL_RE,
            Encoding::Base64UrlNoPadding => &BASE64_URL_NO_PAD_RE,
        }
    }

    /// Detect a recognized encoding prefix on a wire string.
    ///
    /// Returns the padded variant for the shared base64 prefixes; decode
    /// tolerance makes the distinction moot. Checked longest-first, though
    /// the prefixes cannot shadow each other byte-wise.
    pub fn detect(wire: &[u8]) -> Option<Encoding> {
        for encoding in [Encoding::Base64Url, Encoding::Base64, Encoding::Hex] {
            if wire.starts_with(encoding.prefix().as_bytes()) {
                return Some(encoding);
            }
        }
        None
    }

    /// Strip this encoding's prefix from `text` if present; for hex, also
    /// strip a `0x` sub-prefix afterwards.
    pub(crate) fn strip_prefix(self, text: &str) -> &str {
        let text = text.strip_prefix(self.prefix()).unwrap_or(text);
        match self {
            Encoding::Hex => text.strip_prefix("0x").unwrap_or(text),
            _ => text,
        }
    }
}
