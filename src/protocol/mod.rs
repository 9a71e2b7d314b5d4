//! Protocol implementation module
//!
//! This module defines the frame codec, the version-gated capability
//! checks and the payload decoders for identity and live state.

pub mod capability;
pub mod codec;
pub mod identity;
pub mod state;
pub mod text;

pub use self::capability::{Capabilities, VersionInfo};
pub use self::codec::{FrameHeader, ParsedFrame};
pub use self::identity::{PrinterInfo, Toolhead};
pub use self::state::{
    EventData, EventSeverity, EventSource, NetPrinterState, NetPrinterStatus, PauseReason,
    PrinterState, StopReason,
};

/// Protocol version pair used for every outgoing request
pub const REQUEST_MAJOR: u8 = 1;
pub const REQUEST_MINOR: u8 = 0;

/// Command codes carried in the frame header
pub mod command {
    /// Query the live machine state
    pub const GET_STATE: u16 = 0x0001;
    /// Pause the running task
    pub const PAUSE: u16 = 0x0009;
    /// Stop the running task
    pub const STOP: u16 = 0x000A;
    /// Resume a paused task
    pub const RESUME: u16 = 0x000B;
    /// Query identity and versions; also the discovery reply code
    pub const GET_INFO: u16 = 0x000C;
    /// Change the user-assigned printer name
    pub const CHANGE_NAME: u16 = 0x000D;
    /// Start the locate indicator
    pub const START_LOCATE: u16 = 0x000E;
    /// Stop the locate indicator
    pub const STOP_LOCATE: u16 = 0x000F;
    /// Query free storage space
    pub const GET_FREE_SPACE: u16 = 0x0013;
    /// Remove finished tasks from the printer filesystem
    pub const CLEAN_FILESYSTEM: u16 = 0x0024;

    /// Command code a discovery reply must carry
    pub const DISCOVERY_REPLY: u16 = GET_INFO;
}
