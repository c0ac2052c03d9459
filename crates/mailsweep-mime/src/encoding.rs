//! RFC 2047 encoded-word decoding.
//!
//! Header values such as `=?UTF-8?B?SMOpbGxv?= world` are decoded to plain
//! UTF-8. Whitespace between two adjacent encoded words is dropped, as the
//! RFC requires; everything else is kept verbatim.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::error::{Error, Result};

/// Mail clients routinely drop the trailing `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes Base64 data, with or without padding.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    LENIENT_BASE64.decode(data).map_err(Into::into)
}

/// Decodes the payload of a `Q`-encoded word: `_` is a space and `=XX` a
/// hex-escaped byte.
///
/// # Errors
///
/// Returns an error on a truncated or non-hex escape.
pub fn decode_q(payload: &str) -> Result<Vec<u8>> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => out.push(b' '),
            b'=' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".into()))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                out.push(byte);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }

    Ok(out)
}

/// Converts `bytes` in `charset` to a string.
///
/// UTF-8 and US-ASCII are decoded lossily. ISO-8859-1 and its common
/// aliases map byte for byte; windows-1252 is treated the same way, which
/// only differs for the 0x80-0x9F range.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCharset`] for any other charset.
pub fn decode_charset(charset: &str, bytes: &[u8]) -> Result<String> {
    // RFC 2231 language suffix: `utf-8*en`.
    let name = charset
        .split_once('*')
        .map_or(charset, |(name, _)| name)
        .to_ascii_lowercase();

    match name.as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => Ok(String::from_utf8_lossy(bytes).into_owned()),
        "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "l1" | "windows-1252" | "cp1252" => {
            Ok(bytes.iter().map(|&b| char::from(b)).collect())
        }
        _ => Err(Error::UnsupportedCharset(charset.to_string())),
    }
}

/// Decodes one encoded word from its three parts.
///
/// # Errors
///
/// Fails on an unknown encoding letter, a malformed payload, or an
/// unsupported charset.
pub fn decode_word(charset: &str, encoding: &str, payload: &str) -> Result<String> {
    let bytes = match encoding {
        "B" | "b" => decode_base64(payload)?,
        "Q" | "q" => decode_q(payload)?,
        other => {
            return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
        }
    };
    decode_charset(charset, &bytes)
}

/// Decodes every encoded word in a header value.
///
/// Never fails: a malformed word is kept as written, and a word in an
/// unsupported charset is decoded as lossy UTF-8.
#[must_use]
pub fn decode_rfc2047(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (before, candidate) = rest.split_at(start);

        let Some((word, consumed)) = EncodedWord::parse(candidate) else {
            out.push_str(before);
            out.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
            continue;
        };

        if !(after_word && before.chars().all(char::is_whitespace)) {
            out.push_str(before);
        }
        out.push_str(&word.decode().unwrap_or_else(|_| candidate[..consumed].to_string()));
        rest = &candidate[consumed..];
        after_word = true;
    }

    out.push_str(rest);
    out
}

/// `=?charset?encoding?payload?=`, borrowed from the header text.
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    payload: &'a str,
}

impl<'a> EncodedWord<'a> {
    /// Parses a word at the start of `s`; returns it with its byte length.
    fn parse(s: &'a str) -> Option<(Self, usize)> {
        let body = s.strip_prefix("=?")?;
        let (charset, after) = body.split_once('?')?;
        let (encoding, after) = after.split_once('?')?;
        let end = after.find("?=")?;
        let payload = &after[..end];

        if charset.is_empty()
            || charset.contains(char::is_whitespace)
            || encoding.len() != 1
            || payload.contains(char::is_whitespace)
        {
            return None;
        }

        let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;
        Some((
            Self {
                charset,
                encoding,
                payload,
            },
            consumed,
        ))
    }

    fn decode(&self) -> Result<String> {
        match decode_word(self.charset, self.encoding, self.payload) {
            Err(Error::UnsupportedCharset(_)) => {
                let bytes = match self.encoding {
                    "B" | "b" => decode_base64(self.payload)?,
                    _ => decode_q(self.payload)?,
                };
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(decode_rfc2047("Weekly digest"), "Weekly digest");
        assert_eq!(decode_rfc2047(""), "");
    }

    #[test]
    fn test_base64_word() {
        assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
    }

    #[test]
    fn test_base64_without_padding() {
        assert_eq!(decode_rfc2047("=?UTF-8?b?SGk?="), "Hi");
    }

    #[test]
    fn test_q_word() {
        assert_eq!(decode_rfc2047("=?utf-8?Q?H=C3=A9llo_there?="), "Héllo there");
    }

    #[test]
    fn test_adjacent_words_join() {
        let text = "=?utf-8?Q?Big?= =?utf-8?Q?_Sale?=";
        assert_eq!(decode_rfc2047(text), "Big Sale");
    }

    #[test]
    fn test_mixed_plain_and_encoded() {
        let text = "Re: =?iso-8859-1?Q?Caf=E9?= tonight";
        assert_eq!(decode_rfc2047(text), "Re: Café tonight");
    }

    #[test]
    fn test_malformed_word_kept() {
        assert_eq!(decode_rfc2047("price =? unknown"), "price =? unknown");
        assert_eq!(decode_rfc2047("=?utf-8?Q?bad=Z?="), "=?utf-8?Q?bad=Z?=");
    }

    #[test]
    fn test_unknown_charset_falls_back() {
        assert_eq!(decode_rfc2047("=?x-unknown?Q?plain?="), "plain");
    }

    #[test]
    fn test_language_suffix() {
        assert_eq!(decode_word("utf-8*en", "Q", "hi").unwrap(), "hi");
    }

    #[test]
    fn test_decode_q_errors() {
        assert!(decode_q("abc=4").is_err());
        assert!(decode_q("=GG").is_err());
    }

    #[test]
    fn test_unsupported_charset_error() {
        let err = decode_charset("koi8-r", b"x").unwrap_err();
        assert!(matches!(err, Error::UnsupportedCharset(_)));
    }
}
