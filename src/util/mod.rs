//! Utility module
//!
//! This module provides common utilities and helper functions used
//! throughout the library.

use crate::core::{Error, Result};

/// Formats bytes as underscore-separated hex pairs for wire logging
pub fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join("_")
}

/// Forward-only reader over a byte slice.
///
/// Every read fails with a decode error instead of panicking when the
/// requested field overruns the payload. All multi-byte reads are
/// little-endian, matching the wire format.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    /// Current read position in bytes
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Reads the next `len` raw bytes
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(Error::decode(format!(
                "field of {len} bytes at offset {} overruns {}-byte payload",
                self.pos,
                self.data.len()
            )));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Reads one unsigned byte
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    /// Reads one signed byte
    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    /// Reads a signed 16-bit integer
    pub fn i16_le(&mut self) -> Result<i16> {
        let raw = self.bytes(2)?;
        Ok(i16::from_le_bytes([raw[0], raw[1]]))
    }

    /// Reads an unsigned 16-bit integer
    pub fn u16_le(&mut self) -> Result<u16> {
        let raw = self.bytes(2)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    /// Reads an unsigned 32-bit integer
    pub fn u32_le(&mut self) -> Result<u32> {
        let raw = self.bytes(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Reads an unsigned 64-bit integer
    pub fn u64_le(&mut self) -> Result<u64> {
        let raw = self.bytes(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(raw);
        Ok(u64::from_le_bytes(bytes))
    }
}
