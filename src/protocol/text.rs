//! Fixed-width text field handling
//!
//! Strings on the wire are fixed-width byte buffers padded with nulls,
//! spaces or line-control bytes. The text encoding is UTF-8 on newer
//! firmware and Windows-1251 on everything older, selected by the utf8
//! capability.

use encoding_rs::WINDOWS_1251;

use crate::core::{Error, Result};

/// Bytes stripped from the end of every fixed-width text field
const PADDING: &[char] = &['\0', '\n', '\t', '\r', ' '];

/// Decodes a fixed-width text field and strips its trailing padding.
///
/// Invalid UTF-8 on utf8-capable firmware is a decode error; the legacy
/// code page maps every byte.
pub fn decode_padded(utf8: bool, raw: &[u8]) -> Result<String> {
    let text = if utf8 {
        std::str::from_utf8(raw)
            .map_err(|err| Error::decode(format!("invalid UTF-8 in text field: {err}")))?
            .to_owned()
    } else {
        WINDOWS_1251.decode(raw).0.into_owned()
    };
    Ok(text.trim_end_matches(PADDING).to_owned())
}

/// Encodes a string for the wire, trimming trailing padding first
pub fn encode_text(utf8: bool, value: &str) -> Vec<u8> {
    let trimmed = value.trim_end_matches(PADDING);
    if utf8 {
        trimmed.as_bytes().to_vec()
    } else {
        WINDOWS_1251.encode(trimmed).0.into_owned()
    }
}

/// Fits encoded bytes into a fixed-width field, truncating or zero-padding
pub fn to_fixed_field(bytes: &[u8], width: usize) -> Vec<u8> {
    let mut field = vec![0u8; width];
    let len = bytes.len().min(width);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}
