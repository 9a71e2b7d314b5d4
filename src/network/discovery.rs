//! Broadcast discovery of printers on the local network
//!
//! A sweep broadcasts a fixed ASCII probe token a few times over one
//! listening socket, keeps the most recent reply per source address
//! while the window is open, then parses every reply as an identity
//! frame. A malformed reply from one address is logged and skipped; it
//! never aborts the sweep.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::core::{Result, DEFAULT_BROADCAST_PORT, DEFAULT_INTERACTION_PORT, DISCOVERY_TOKEN};
use crate::printer::Printer;
use crate::protocol::codec::{self, HEADER_LEN, MAX_FRAME_LEN};
use crate::protocol::command;
use crate::protocol::identity::PrinterInfo;
use crate::util::hex_dump;

/// Configuration for a discovery sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Number of probe datagrams to broadcast
    pub attempts: usize,
    /// Delay between probe datagrams; the sweep window is
    /// `attempts * send_interval`
    pub send_interval: Duration,
    /// Port printers listen on for probes
    pub broadcast_port: u16,
    /// Destination address for probes
    pub broadcast_ip: IpAddr,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            attempts: 3,
            send_interval: Duration::from_secs(2),
            broadcast_port: DEFAULT_BROADCAST_PORT,
            broadcast_ip: IpAddr::V4(Ipv4Addr::BROADCAST),
        }
    }
}

/// Broadcasts the probe token and returns every printer that answered.
///
/// Printers reporting a serial number are deduplicated by serial, first
/// reply wins; printers without one are kept per source address. Serial-
/// keyed printers come first in the result.
pub async fn search_printers(config: &DiscoveryConfig) -> Result<Vec<Printer>> {
    info!(
        attempts = config.attempts,
        interval = ?config.send_interval,
        port = config.broadcast_port,
        "searching for printers"
    );

    let socket = broadcast_socket()?;
    let target = SocketAddr::new(config.broadcast_ip, config.broadcast_port);
    let replies = collect_replies(&socket, target, config).await?;
    drop(socket);

    Ok(build_printers(replies))
}

/// Builds an IPv4 socket that may send to the broadcast address
fn broadcast_socket() -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    let bind_addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, 0).into();
    socket.bind(&bind_addr.into())?;
    Ok(UdpSocket::from_std(socket.into())?)
}

/// Probes and listens until the sweep window closes.
///
/// Replies are keyed by source address, last payload per address wins.
/// Reply order is preserved for the dedup pass.
async fn collect_replies(
    socket: &UdpSocket,
    target: SocketAddr,
    config: &DiscoveryConfig,
) -> Result<Vec<(SocketAddr, Vec<u8>)>> {
    let mut replies: Vec<(SocketAddr, Vec<u8>)> = Vec::new();
    let mut buf = vec![0u8; MAX_FRAME_LEN];
    let mut sent = 0usize;

    let window = config.send_interval * config.attempts as u32;
    let deadline = tokio::time::sleep(window);
    tokio::pin!(deadline);
    let mut probe_timer = tokio::time::interval(config.send_interval);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = probe_timer.tick(), if sent < config.attempts => {
                socket.send_to(DISCOVERY_TOKEN, target).await?;
                sent += 1;
                debug!(attempt = sent, "broadcast probe sent");
            }
            received = socket.recv_from(&mut buf) => {
                let (len, addr) = received?;
                let payload = buf[..len].to_vec();
                match replies.iter_mut().find(|(known, _)| *known == addr) {
                    Some(entry) => entry.1 = payload,
                    None => replies.push((addr, payload)),
                }
            }
        }
    }

    Ok(replies)
}

/// Parses each reply as an identity frame and deduplicates the results
fn build_printers(replies: Vec<(SocketAddr, Vec<u8>)>) -> Vec<Printer> {
    let mut by_serial: Vec<Printer> = Vec::new();
    let mut seen_serials: Vec<String> = Vec::new();
    let mut by_addr: Vec<Printer> = Vec::new();

    for (addr, payload) in replies {
        let header = match codec::decode_header(&payload) {
            Ok(header) => header,
            Err(err) => {
                warn!(%addr, error = %err, "failed to parse discovery reply header, ignoring");
                debug!(payload = %hex_dump(&payload), "offending payload");
                continue;
            }
        };

        if header.command_code != command::DISCOVERY_REPLY {
            warn!(
                %addr,
                command = header.command_code,
                "unexpected command code in discovery reply, ignoring"
            );
            continue;
        }

        let info = match PrinterInfo::from_identity(
            header.protocol_major,
            header.protocol_minor,
            &payload[HEADER_LEN..],
        ) {
            Ok(info) => info,
            Err(err) => {
                warn!(%addr, error = %err, "failed to decode discovery identity, ignoring");
                continue;
            }
        };

        if info.serial().is_empty() {
            warn!(%addr, "printer without serial number detected");
            by_addr.push(Printer::with_info(addr.ip(), DEFAULT_INTERACTION_PORT, info));
        } else if seen_serials.iter().any(|seen| seen == info.serial()) {
            debug!(serial = info.serial(), "multiple responses from one printer");
        } else {
            seen_serials.push(info.serial().to_owned());
            by_serial.push(Printer::with_info(addr.ip(), DEFAULT_INTERACTION_PORT, info));
        }
    }

    by_serial.into_iter().chain(by_addr).collect()
}
