//! Async UDP protocol client for PICASO 3D printers.
//!
//! This library speaks the proprietary request/response protocol PICASO
//! Designer printers expose on the local network: it discovers devices by
//! broadcast, reads identity and version information, polls live machine
//! state (temperatures, task progress, pause and stop causes, firmware
//! events) and drives the basic task commands.
//!
//! # Quick start
//!
//! ```no_run
//! use picaso3d::{DiscoveryConfig, Printer};
//!
//! #[tokio::main]
//! async fn main() -> picaso3d::Result<()> {
//!     // Find printers on the local network.
//!     let printers = picaso3d::search_printers(&DiscoveryConfig::default()).await?;
//!     for printer in &printers {
//!         let info = printer.info();
//!         println!("{} ({}) at {}", info.name(), info.serial(), printer.addr());
//!     }
//!
//!     // Or talk to a known address directly.
//!     let printer = Printer::new("192.168.1.50".parse().unwrap());
//!     printer.update_info().await?;
//!     let state = printer.state().await?;
//!     println!("bed at {} °C", state.bed_temperature);
//!     Ok(())
//! }
//! ```
//!
//! # Protocol notes
//!
//! Every message is an 8-byte header plus payload. The live-state payload
//! exists in three incompatible layouts selected by the protocol major
//! version, and several features (UTF-8 text, filesystem clean, preheat
//! journal, material profiles) are gated on firmware version thresholds
//! rather than advertised. The transport binds one ephemeral socket per
//! exchange, and all exchanges for one [`Printer`] are serialized through
//! its request lock.
//!
//! The protocol is unauthenticated and unencrypted; it is only suitable
//! for trusted local networks.

pub mod core;
pub mod network;
pub mod printer;
pub mod protocol;
mod util;

pub use crate::core::{Error, NozzleType, PrinterType, Result};
pub use crate::network::{search_printers, DiscoveryConfig, Expectations, RequestOptions};
pub use crate::printer::Printer;
pub use crate::protocol::{
    Capabilities, EventData, EventSeverity, EventSource, NetPrinterState, NetPrinterStatus,
    ParsedFrame, PauseReason, PrinterInfo, PrinterState, StopReason, Toolhead, VersionInfo,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
