//! Constant-time text codec for secret material.
//!
//! Encoding and decoding go through constant-time primitives (`base64ct`,
//! plus table-free hex), and the comparison helpers never branch on where
//! two byte strings first differ. Use [`equals`] and [`starts_with`]
//! instead of `==` whenever one side is a secret (MAC, token, key).

use core::hint::black_box;

use base64ct::{Base64, Base64Unpadded, Base64Url, Base64UrlUnpadded, Encoding as _};
use thiserror::Error;

use crate::encoding::Encoding;

/// A string failed to decode under the requested [`Encoding`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {encoding} string")]
pub struct InvalidEncodedString {
    /// Human name of the encoding that rejected the input.
    pub encoding: &'static str,
}

impl InvalidEncodedString {
    fn new(encoding: Encoding) -> Self {
        let encoding = match encoding {
            Encoding::Hex => "hex",
            Encoding::Base64 | Encoding::Base64NoPadding => "base64",
            Encoding::Base64Url | Encoding::Base64UrlNoPadding => "base64url",
        };
        Self { encoding }
    }
}

/// Encode bytes under `encoding`'s alphabet.
///
/// With `with_prefix`, the canonical self-describing prefix is prepended.
///
/// # Example
///
/// ```rust
/// use marshal_core::{ct, Encoding};
///
/// assert_eq!(ct::encode(Encoding::Base64, b"hello", true), "base64:aGVsbG8=");
/// assert_eq!(ct::encode(Encoding::Hex, b"hello", false), "68656c6c6f");
/// ```
pub fn encode(encoding: Encoding, bytes: impl AsRef<[u8]>, with_prefix: bool) -> String {
    let bytes = bytes.as_ref();
    let body = match encoding {
        Encoding::Hex => hex::encode(bytes),
        Encoding::Base64 => Base64::encode_string(bytes),
        Encoding::Base64NoPadding => Base64Unpadded::encode_string(bytes),
        Encoding::Base64Url => Base64Url::encode_string(bytes),
        Encoding::Base64UrlNoPadding => Base64UrlUnpadded::encode_string(bytes),
    };
    if with_prefix {
        format!("{}{}", encoding.prefix(), body)
    } else {
        body
    }
}

/// Decode text under `encoding`'s alphabet.
///
/// A recognized prefix is stripped if present (for hex, a `0x` sub-prefix
/// too). Base64 decoding tolerates both padded and unpadded input since the
/// padding variants share a prefix. In `strict` mode the stripped input
/// must fully match the encoding's validation pattern first.
pub fn decode(
    encoding: Encoding,
    input: impl AsRef<[u8]>,
    strict: bool,
) -> Result<Vec<u8>, InvalidEncodedString> {
    let text =
        std::str::from_utf8(input.as_ref()).map_err(|_| InvalidEncodedString::new(encoding))?;
    let text = encoding.strip_prefix(text);

    if strict && !encoding.regex().is_match(text) {
        return Err(InvalidEncodedString::new(encoding));
    }

    match encoding {
        Encoding::Hex => hex::decode(text).map_err(|_| InvalidEncodedString::new(encoding)),
        Encoding::Base64 | Encoding::Base64NoPadding => {
            Base64Unpadded::decode_vec(text.trim_end_matches('='))
                .map_err(|_| InvalidEncodedString::new(encoding))
        }
        Encoding::Base64Url | Encoding::Base64UrlNoPadding => {
            Base64UrlUnpadded::decode_vec(text.trim_end_matches('='))
                .map_err(|_| InvalidEncodedString::new(encoding))
        }
    }
}

/// Byte-exact equality whose run time does not depend on where the inputs
/// first differ.
///
/// Differences are OR-accumulated over the full length of the longer input
/// and the result is branched on exactly once. The length comparison itself
/// is leaked, which is widely considered safe. `black_box` keeps the
/// accumulator from being collapsed into a short-circuiting compare.
pub fn equals(a: impl AsRef<[u8]>, b: impl AsRef<[u8]>) -> bool {
    let (a, b) = (a.as_ref(), b.as_ref());
    let mut acc = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        acc |= usize::from(x ^ y);
    }
    black_box(acc) == 0
}

/// Constant-time prefix test; an empty needle always matches.
///
/// A needle longer than the haystack returns early, leaking only lengths.
pub fn starts_with(haystack: impl AsRef<[u8]>, needle: impl AsRef<[u8]>) -> bool {
    let (haystack, needle) = (haystack.as_ref(), needle.as_ref());
    if needle.len() > haystack.len() {
        return false;
    }
    let mut acc = 0u8;
    for i in 0..needle.len() {
        acc |= haystack[i] ^ needle[i];
    }
    black_box(acc) == 0
}
