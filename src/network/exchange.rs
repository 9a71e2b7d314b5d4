//! One-shot UDP request/response exchange
//!
//! Every exchange opens a fresh ephemeral socket, sends a single request
//! datagram and reassembles each response from one or more inbound
//! datagrams. Because the socket never outlives the exchange, only the
//! addressed peer answers on it and no correlation id is needed; the
//! socket is released on every exit path, including cancellation, by
//! ordinary drop semantics.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use crate::core::{Error, Result, DEFAULT_READ_TIMEOUT_SECS};
use crate::protocol::codec::{self, FrameHeader, ParsedFrame, HEADER_LEN, MAX_FRAME_LEN};
use crate::util::hex_dump;

/// Per-exchange timeout configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Timeout applied to each datagram read
    pub read_timeout: Duration,
    /// Optional cap on assembling one complete response
    pub total_timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        RequestOptions {
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            total_timeout: None,
        }
    }
}

/// Header fields a response is required to match.
///
/// Any populated field that differs from the response header fails the
/// exchange with a protocol mismatch; mismatches are never retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expectations {
    pub protocol_major: Option<u8>,
    pub protocol_minor: Option<u8>,
    pub command_code: Option<u16>,
    pub total_length: Option<u16>,
}

impl Expectations {
    fn check(&self, header: &FrameHeader) -> Result<()> {
        if let Some(expected) = self.total_length {
            if header.total_length != expected {
                return Err(Error::mismatch(format!(
                    "payload size mismatch: {} != {expected}",
                    header.total_length
                )));
            }
        }
        if let Some(expected) = self.command_code {
            if header.command_code != expected {
                return Err(Error::mismatch(format!(
                    "command code mismatch: {:#06x} != {expected:#06x}",
                    header.command_code
                )));
            }
        }
        if let Some(expected) = self.protocol_major {
            if header.protocol_major != expected {
                return Err(Error::mismatch(format!(
                    "protocol major mismatch: {} != {expected}",
                    header.protocol_major
                )));
            }
        }
        if let Some(expected) = self.protocol_minor {
            if header.protocol_minor != expected {
                return Err(Error::mismatch(format!(
                    "protocol minor mismatch: {} != {expected}",
                    header.protocol_minor
                )));
            }
        }
        Ok(())
    }
}

/// Sends one request frame to `addr` and collects response frames.
///
/// With `num_responses` set, exactly that many frames must arrive before
/// the read timeout and a timeout is an error. Without it, collection
/// ends quietly at the first read timeout and whatever arrived (possibly
/// nothing) is returned.
pub async fn send_request(
    addr: SocketAddr,
    major: u8,
    minor: u8,
    command_code: u16,
    data: &[u8],
    num_responses: Option<usize>,
    expect: Expectations,
    options: RequestOptions,
) -> Result<Vec<ParsedFrame>> {
    let frame = codec::encode_frame(major, minor, command_code, data)?;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    debug!(
        peer = %addr,
        length = frame.len(),
        data = %hex_dump(&frame),
        "UDP send"
    );
    socket.send_to(&frame, addr).await?;

    let mut frames = Vec::new();
    loop {
        if let Some(limit) = num_responses {
            if frames.len() >= limit {
                break;
            }
        }
        match read_single_response(&socket, addr, &expect, options).await {
            Ok(frame) => frames.push(frame),
            Err(Error::Timeout(_)) if num_responses.is_none() => break,
            Err(err) => return Err(err),
        }
    }
    Ok(frames)
}

/// Assembles one complete response, applying the total timeout if set
async fn read_single_response(
    socket: &UdpSocket,
    peer: SocketAddr,
    expect: &Expectations,
    options: RequestOptions,
) -> Result<ParsedFrame> {
    match options.total_timeout {
        Some(total) => timeout(total, assemble_response(socket, peer, expect, options.read_timeout))
            .await
            .map_err(|_| {
                Error::timeout(format!("no complete response from {peer} within {total:?}"))
            })?,
        None => assemble_response(socket, peer, expect, options.read_timeout).await,
    }
}

async fn assemble_response(
    socket: &UdpSocket,
    peer: SocketAddr,
    expect: &Expectations,
    read_timeout: Duration,
) -> Result<ParsedFrame> {
    let mut buffer = BytesMut::new();
    let mut header: Option<FrameHeader> = None;
    let mut datagram = vec![0u8; MAX_FRAME_LEN];

    loop {
        if let Some(parsed) = header {
            let expected = parsed.total_length as usize;
            if buffer.len() >= expected {
                if buffer.len() != expected {
                    return Err(Error::decode(format!(
                        "accumulated {} bytes for a frame declaring {expected}",
                        buffer.len()
                    )));
                }
                let mut frame = buffer.freeze();
                let payload = frame.split_off(HEADER_LEN);
                return Ok(ParsedFrame {
                    protocol_major: parsed.protocol_major,
                    protocol_minor: parsed.protocol_minor,
                    command_code: parsed.command_code,
                    payload,
                });
            }
        }

        let (len, _) = timeout(read_timeout, socket.recv_from(&mut datagram))
            .await
            .map_err(|_| {
                Error::timeout(format!("no datagram from {peer} within {read_timeout:?}"))
            })??;
        buffer.extend_from_slice(&datagram[..len]);
        debug!(
            peer = %peer,
            length = buffer.len(),
            data = %hex_dump(&buffer),
            "UDP receive"
        );

        // The header is parsed once, as soon as enough bytes exist.
        if header.is_none() && buffer.len() >= HEADER_LEN {
            let parsed = codec::decode_header(&buffer)?;
            expect.check(&parsed)?;
            header = Some(parsed);
        }
    }
}
