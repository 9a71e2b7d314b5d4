//! Frame encoding and decoding
//!
//! Every message is one frame: an 8-byte header followed by the payload.
//! The header carries the protocol version pair, a 16-bit command code, a
//! reserved 16-bit field (zero on send) and the total frame length
//! including the header itself. Multi-byte header integers are
//! little-endian on the wire.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::{Error, Result};

/// Size of the fixed frame header in bytes
pub const HEADER_LEN: usize = 8;

/// Largest frame the 16-bit total-length field can describe
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

/// Parsed fixed-size frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub command_code: u16,
    /// Total frame length including the header
    pub total_length: u16,
}

/// One complete response frame, header fields plus payload
#[derive(Debug, Clone)]
pub struct ParsedFrame {
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub command_code: u16,
    pub payload: Bytes,
}

/// Encodes a frame from its header fields and payload bytes.
///
/// Fails with `SizeOverflow` when the payload plus header does not fit
/// the 16-bit total-length field.
pub fn encode_frame(major: u8, minor: u8, command_code: u16, data: &[u8]) -> Result<Bytes> {
    let total = data.len() + HEADER_LEN;
    if total > MAX_FRAME_LEN {
        return Err(Error::SizeOverflow { length: total });
    }

    let mut buf = BytesMut::with_capacity(total);
    buf.put_u8(major);
    buf.put_u8(minor);
    buf.put_u16_le(command_code);
    buf.put_u16_le(0);
    buf.put_u16_le(total as u16);
    buf.extend_from_slice(data);
    Ok(buf.freeze())
}

/// Decodes the fixed header from the front of `buffer`.
///
/// Pure and I/O-free; fails when fewer than 8 bytes are supplied.
pub fn decode_header(buffer: &[u8]) -> Result<FrameHeader> {
    if buffer.len() < HEADER_LEN {
        return Err(Error::decode(format!(
            "truncated header: {} of {HEADER_LEN} bytes",
            buffer.len()
        )));
    }

    Ok(FrameHeader {
        protocol_major: buffer[0],
        protocol_minor: buffer[1],
        command_code: u16::from_le_bytes([buffer[2], buffer[3]]),
        total_length: u16::from_le_bytes([buffer[6], buffer[7]]),
    })
}
