//! Printer client and request serialization
//!
//! [`Printer`] owns the identity snapshot for one device and funnels
//! every hardware-facing operation through a per-device request lock.
//! The device speaks one logical conversation at a time: interleaving
//! exchanges on the ephemeral-socket transport would corrupt datagram
//! reassembly, so exactly one exchange is in flight per printer and
//! concurrent callers queue in FIFO order.

use std::net::{IpAddr, SocketAddr};

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::{Error, Result, DEFAULT_INTERACTION_PORT};
use crate::network::exchange::{self, Expectations, RequestOptions};
use crate::protocol::codec::ParsedFrame;
use crate::protocol::command;
use crate::protocol::identity::PrinterInfo;
use crate::protocol::state::{self, PrinterState};
use crate::protocol::text;
use crate::protocol::{REQUEST_MAJOR, REQUEST_MINOR};
use crate::util::Cursor;

/// Width of the fixed name field in a change-name request
const NAME_FIELD_LEN: usize = 20;

/// Client for one printer on the local network
pub struct Printer {
    host: IpAddr,
    port: u16,
    options: RequestOptions,
    request_lock: Mutex<()>,
    info: RwLock<PrinterInfo>,
}

impl Printer {
    /// Creates a client for `host` on the default interaction port
    pub fn new(host: IpAddr) -> Self {
        Self::with_port(host, DEFAULT_INTERACTION_PORT)
    }

    /// Creates a client for `host` on a specific port
    pub fn with_port(host: IpAddr, port: u16) -> Self {
        Self::with_info(host, port, PrinterInfo::default())
    }

    /// Creates a client with an already-known identity, as discovery does
    pub(crate) fn with_info(host: IpAddr, port: u16, info: PrinterInfo) -> Self {
        Printer {
            host,
            port,
            options: RequestOptions::default(),
            request_lock: Mutex::new(()),
            info: RwLock::new(info),
        }
    }

    /// Printer address requests are sent to
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Timeouts applied to every exchange
    pub fn request_options(&self) -> RequestOptions {
        self.options
    }

    pub fn set_request_options(&mut self, options: RequestOptions) {
        self.options = options;
    }

    /// Snapshot of the identity known from the last refresh
    pub fn info(&self) -> PrinterInfo {
        self.info.read().clone()
    }

    /// Refreshes identity and versions from the device.
    ///
    /// On a partial decode failure the fields applied so far are kept,
    /// matching the payload decoder's partial-update policy; the printer
    /// should not be trusted until a refresh succeeds.
    pub async fn update_info(&self) -> Result<PrinterInfo> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "refreshing printer information");

        let response = self
            .request_v1(
                command::GET_INFO,
                &[],
                Expectations {
                    command_code: Some(command::GET_INFO),
                    ..Default::default()
                },
            )
            .await?;

        let mut info = self.info.read().clone();
        let applied =
            info.apply_identity(response.protocol_major, response.protocol_minor, &response.payload);
        *self.info.write() = info.clone();
        applied?;
        Ok(info)
    }

    /// Queries the live machine state
    pub async fn state(&self) -> Result<PrinterState> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "querying printer state");

        let response = self
            .request_v1(
                command::GET_STATE,
                &[],
                Expectations {
                    command_code: Some(command::GET_STATE),
                    protocol_minor: Some(1),
                    ..Default::default()
                },
            )
            .await?;

        let (printer_type, utf8) = {
            let info = self.info.read();
            (info.printer_type(), info.capabilities().utf8_text)
        };
        state::decode_state(&response, printer_type, utf8)
    }

    /// Pauses the running task
    pub async fn pause(&self) -> Result<()> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "pausing printer");
        self.request_v1_atomic(command::PAUSE, &[], None).await?;
        Ok(())
    }

    /// Resumes a paused task
    pub async fn resume(&self) -> Result<()> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "resuming printer");
        self.request_v1_atomic(command::RESUME, &[], None).await?;
        Ok(())
    }

    /// Stops the running task
    pub async fn stop(&self) -> Result<()> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "stopping printer");
        self.request_v1_atomic(command::STOP, &[], None).await?;
        Ok(())
    }

    /// Starts the locate indicator so the device can be found visually
    pub async fn start_locating(&self) -> Result<()> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "starting printer locate");
        self.request_v1_atomic(command::START_LOCATE, &[], None).await?;
        Ok(())
    }

    /// Stops the locate indicator
    pub async fn stop_locating(&self) -> Result<()> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "stopping printer locate");
        self.request_v1_atomic(command::STOP_LOCATE, &[], None).await?;
        Ok(())
    }

    /// Changes the user-assigned printer name
    pub async fn change_name(&self, new_name: &str) -> Result<()> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), name = new_name, "changing printer name");

        let utf8 = self.info.read().capabilities().utf8_text;
        let field = text::to_fixed_field(&text::encode_text(utf8, new_name), NAME_FIELD_LEN);
        self.request_v1_atomic(command::CHANGE_NAME, &field, None).await?;
        Ok(())
    }

    /// Restores the printer name to its serial number
    pub async fn reset_name(&self) -> Result<()> {
        let serial = self.info.read().serial().to_owned();
        if serial.is_empty() {
            return Err(Error::invalid_state("printer serial number is not known"));
        }
        self.change_name(&serial).await
    }

    /// Queries free storage space in bytes
    pub async fn free_space(&self) -> Result<u64> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "querying free space");

        let response = self
            .request_v1_atomic(command::GET_FREE_SPACE, &[], Some(16))
            .await?;
        Cursor::new(&response.payload).u64_le()
    }

    /// Removes finished tasks from the printer filesystem
    pub async fn clean_filesystem(&self) -> Result<()> {
        let _guard = self.request_lock.lock().await;
        debug!(peer = %self.addr(), "cleaning printer filesystem");
        self.request_v1_atomic(command::CLEAN_FILESYSTEM, &[], Some(12)).await?;
        Ok(())
    }

    /// One request, one response, caller-supplied expectations
    async fn request_v1(
        &self,
        command_code: u16,
        data: &[u8],
        expect: Expectations,
    ) -> Result<ParsedFrame> {
        let mut frames = exchange::send_request(
            self.addr(),
            REQUEST_MAJOR,
            REQUEST_MINOR,
            command_code,
            data,
            Some(1),
            expect,
            self.options,
        )
        .await?;
        frames
            .pop()
            .ok_or_else(|| Error::invalid_state("exchange returned no frames"))
    }

    /// One request, one response validated against the request's own
    /// command code and protocol major
    async fn request_v1_atomic(
        &self,
        command_code: u16,
        data: &[u8],
        expect_total_length: Option<u16>,
    ) -> Result<ParsedFrame> {
        self.request_v1(
            command_code,
            data,
            Expectations {
                protocol_major: Some(REQUEST_MAJOR),
                command_code: Some(command_code),
                total_length: expect_total_length,
                ..Default::default()
            },
        )
        .await
    }
}

impl std::fmt::Debug for Printer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Printer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("serial", &self.info.read().serial())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::codec;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tokio::time::{sleep, Instant};

    fn fast_options() -> RequestOptions {
        RequestOptions {
            read_timeout: Duration::from_millis(500),
            total_timeout: None,
        }
    }

    fn printer_for(port: u16) -> Printer {
        let mut printer = Printer::with_port(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        printer.set_request_options(fast_options());
        printer
    }

    fn free_space_reply(bytes: u64) -> Vec<u8> {
        codec::encode_frame(1, 0, command::GET_FREE_SPACE, &bytes.to_le_bytes())
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_free_space_query() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, requester) = socket.recv_from(&mut buf).await.unwrap();
            socket
                .send_to(&free_space_reply(1 << 30), requester)
                .await
                .unwrap();
        });

        let printer = printer_for(port);
        assert_eq!(printer.free_space().await.unwrap(), 1 << 30);
    }

    #[tokio::test]
    async fn test_atomic_request_rejects_wrong_command() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, requester) = socket.recv_from(&mut buf).await.unwrap();
            let reply = codec::encode_frame(1, 0, command::RESUME, &[]).unwrap();
            socket.send_to(&reply, requester).await.unwrap();
        });

        let printer = printer_for(port);
        let err = printer.pause().await.unwrap_err();
        assert!(matches!(err, Error::ProtocolMismatch(_)));
    }

    #[tokio::test]
    async fn test_concurrent_operations_never_overlap() {
        // Mock printer that asserts the second request only arrives after
        // the first exchange completed.
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let mut buf = [0u8; 64];

            let (_, first_requester) = socket.recv_from(&mut buf).await.unwrap();
            // Hold the first exchange open long enough that an unguarded
            // second request would arrive meanwhile.
            sleep(Duration::from_millis(150)).await;
            let first_replied = Instant::now();
            socket
                .send_to(&free_space_reply(1), first_requester)
                .await
                .unwrap();

            let (_, second_requester) = socket.recv_from(&mut buf).await.unwrap();
            let second_arrived = Instant::now();
            assert!(
                second_arrived >= first_replied,
                "second exchange started before the first completed"
            );
            // Each exchange binds its own ephemeral socket.
            assert_ne!(first_requester, second_requester);
            socket
                .send_to(&free_space_reply(2), second_requester)
                .await
                .unwrap();
        });

        let printer = Arc::new(printer_for(port));
        let first = {
            let printer = Arc::clone(&printer);
            tokio::spawn(async move { printer.free_space().await })
        };
        // Give the first call a head start so ordering is deterministic.
        sleep(Duration::from_millis(30)).await;
        let second = {
            let printer = Arc::clone(&printer);
            tokio::spawn(async move { printer.free_space().await })
        };

        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_eq!((first, second), (1, 2));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_update_info_applies_identity() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, requester) = socket.recv_from(&mut buf).await.unwrap();

            let mut data = vec![0u8, 7u8, 0, 1, 6];
            data.extend_from_slice(&text::to_fixed_field(b"Workshop", 20));
            data.extend_from_slice(&text::to_fixed_field(b"SN-500", 50));
            data.extend_from_slice(&[0u8; 6]);
            for _ in 0..2 {
                data.extend_from_slice(&text::to_fixed_field(b"", 10));
                data.push(40);
                data.extend_from_slice(&text::to_fixed_field(b"", 40));
            }
            let reply = codec::encode_frame(1, 2, command::GET_INFO, &data).unwrap();
            socket.send_to(&reply, requester).await.unwrap();
        });

        let printer = printer_for(port);
        let info = printer.update_info().await.unwrap();
        assert_eq!(info.name(), "Workshop");
        assert_eq!(info.serial(), "SN-500");
        assert!(info.capabilities().utf8_text);
        // The snapshot on the client matches what was returned.
        assert_eq!(printer.info(), info);
    }

    #[tokio::test]
    async fn test_reset_name_requires_serial() {
        let printer = printer_for(1);
        let err = printer.reset_name().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_change_name_sends_fixed_field() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, requester) = socket.recv_from(&mut buf).await.unwrap();
            let request = buf[..len].to_vec();
            let reply = codec::encode_frame(1, 0, command::CHANGE_NAME, &[]).unwrap();
            socket.send_to(&reply, requester).await.unwrap();
            request
        });

        let printer = printer_for(port);
        printer.change_name("Hall printer").await.unwrap();

        let request = server.await.unwrap();
        let header = codec::decode_header(&request).unwrap();
        assert_eq!(header.command_code, command::CHANGE_NAME);
        assert_eq!(header.total_length as usize, 8 + NAME_FIELD_LEN);
        assert_eq!(&request[8..20], b"Hall printer");
        assert!(request[20..28].iter().all(|&b| b == 0));
    }
}
