//! Live-state payload decoding
//!
//! The state response exists in three incompatible layouts, one per
//! protocol major. Majors 1 and 2 insert extra flag bytes near the front,
//! shifting every later field by a per-major `first_offset`; major 2 also
//! doubles the event journal and widens its slots. Unknown enum values
//! anywhere in the payload are preserved as raw integers rather than
//! rejected; only header-level mismatches (size, command, version) are
//! fatal.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::core::{Error, PrinterType, Result};
use crate::protocol::codec::{ParsedFrame, HEADER_LEN};
use crate::protocol::text;

/// Expected total frame length for protocol major 0
pub const TOTAL_LEN_V0: usize = 343;
/// Expected total frame length for protocol major 1
pub const TOTAL_LEN_V1: usize = 344;
/// Expected total frame length for protocol major 2
pub const TOTAL_LEN_V2: usize = 387;

/// High-level machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetPrinterState {
    Unknown,
    Printing,
    Paused,
    Idle,
    Service,
    PrepareForPrinting,
    PrepareForPause,
    PrepareForStop,
    PrePrint,
    /// Value outside the known enumeration, preserved as received
    Other(i32),
}

impl NetPrinterState {
    /// Maps a raw wire value, preserving unknown values
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => NetPrinterState::Unknown,
            1 => NetPrinterState::Printing,
            2 => NetPrinterState::Paused,
            3 => NetPrinterState::Idle,
            4 => NetPrinterState::Service,
            5 => NetPrinterState::PrepareForPrinting,
            6 => NetPrinterState::PrepareForPause,
            7 => NetPrinterState::PrepareForStop,
            8 => NetPrinterState::PrePrint,
            other => NetPrinterState::Other(other),
        }
    }
}

/// Status values above the basic state machine.
///
/// The two high values are bit patterns the firmware reports through the
/// same signed field, kept here as their reinterpreted representations.
const STATUS_CONNECTION_ERROR: i32 = 0x8000_0000u32 as i32;
const STATUS_INITIAL_STATE: i32 = 0x8000_0004u32 as i32;

/// Detailed status reported alongside the machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetPrinterStatus {
    Unknown,
    PrintProblem,
    CriticalError,
    WaitUser,
    WaitNewTask,
    Service,
    MainPrint,
    PrintDone,
    PrintPaused,
    AdjectiveWarning,
    UpdateDownload,
    ConnectionError,
    InitialState,
    /// Value outside the known enumeration, preserved as received
    Other(i32),
}

impl NetPrinterStatus {
    /// Maps a raw wire value, preserving unknown values
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => NetPrinterStatus::Unknown,
            1 => NetPrinterStatus::PrintProblem,
            2 => NetPrinterStatus::CriticalError,
            3 => NetPrinterStatus::WaitUser,
            4 => NetPrinterStatus::WaitNewTask,
            5 => NetPrinterStatus::Service,
            6 => NetPrinterStatus::MainPrint,
            7 => NetPrinterStatus::PrintDone,
            8 => NetPrinterStatus::PrintPaused,
            9 => NetPrinterStatus::AdjectiveWarning,
            10 => NetPrinterStatus::UpdateDownload,
            STATUS_CONNECTION_ERROR => NetPrinterStatus::ConnectionError,
            STATUS_INITIAL_STATE => NetPrinterStatus::InitialState,
            other => NetPrinterStatus::Other(other),
        }
    }
}

/// Severity of a firmware event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Not carried by the wire layout that produced the event
    Unknown,
    Info,
    Warning,
    Error,
    Critical,
    Fatal,
    Other(i32),
}

impl EventSeverity {
    /// Maps a raw wire value, preserving unknown values
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => EventSeverity::Info,
            1 => EventSeverity::Warning,
            2 => EventSeverity::Error,
            3 => EventSeverity::Critical,
            4 => EventSeverity::Fatal,
            other => EventSeverity::Other(other),
        }
    }
}

/// Mechanical subsystem an event originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    /// Not carried by the wire layout that produced the event
    Unknown,
    None,
    N1,
    N2,
    R,
    T,
    X,
    Y,
    Z,
    E,
    Tz,
    Ph,
    Xy,
    Other(i32),
}

impl EventSource {
    /// Maps a raw wire value, preserving unknown values
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => EventSource::None,
            1 => EventSource::N1,
            2 => EventSource::N2,
            3 => EventSource::R,
            4 => EventSource::T,
            5 => EventSource::X,
            6 => EventSource::Y,
            7 => EventSource::Z,
            8 => EventSource::E,
            9 => EventSource::Tz,
            10 => EventSource::Ph,
            11 => EventSource::Xy,
            other => EventSource::Other(other),
        }
    }
}

/// One entry from the state payload's event journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventData {
    pub code: i32,
    pub severity: EventSeverity,
    pub source: EventSource,
    /// Zero when the protocol version carries no event timestamps
    pub timestamp: u32,
}

bitflags! {
    /// Simultaneously-possible causes for a paused task
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PauseReason: u32 {
        const LAYER_TIME = 1 << 0;
        const BY_USER = 1 << 1;
        const NOZZLE_CLEAN = 1 << 2;
        const FIRST_NOZZLE_BLOCKED = 1 << 3;
        const RADIATOR_OVERHEAT = 1 << 4;
        const FIRST_NOZZLE_RUNOUT = 1 << 5;
        const HIT_Z_ENDSTOP = 1 << 6;
        const ZBOARD_ERROR = 1 << 7;
        const LAYER_PAUSE = 1 << 8;
        const SECOND_NOZZLE_BLOCKED = 1 << 9;
        const FIRST_NOZZLE_SLIPPAGE = 1 << 10;
        const SECOND_NOZZLE_SLIPPAGE = 1 << 11;
        const SECOND_NOZZLE_RUNOUT = 1 << 12;
        const WRONG_NOZZLE_EXTRUDES = 1 << 13;
    }
}

bitflags! {
    /// Simultaneously-possible causes for a stopped task
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StopReason: u32 {
        const GCODE_ERROR = 1 << 1;
        const HARDWARE_ERROR = 1 << 4;
    }
}

impl serde::Serialize for PauseReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> serde::Deserialize<'de> for PauseReason {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u32::deserialize(deserializer).map(PauseReason::from_bits_retain)
    }
}

impl serde::Serialize for StopReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> serde::Deserialize<'de> for StopReason {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u32::deserialize(deserializer).map(StopReason::from_bits_retain)
    }
}

/// Snapshot of the printer's live state.
///
/// Created fresh on every state query and never merged with a previous
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterState {
    pub state: NetPrinterState,
    pub status: NetPrinterStatus,
    pub task_name: String,
    pub task_progress: f32,
    /// Remaining task time in seconds
    pub task_remaining: f32,
    pub first_nozzle_temperature: f32,
    pub second_nozzle_temperature: f32,
    pub chamber_temperature: f32,
    pub bed_temperature: f32,
    pub events: Vec<EventData>,
    pub pause_reason: PauseReason,
    pub stop_reason: StopReason,
    pub ready: bool,
    pub preheat_state: bool,
    /// Set when the hardware variant cannot report events on this firmware
    pub events_require_upgrade: bool,
}

impl Default for PrinterState {
    fn default() -> Self {
        PrinterState {
            state: NetPrinterState::Idle,
            status: NetPrinterStatus::InitialState,
            task_name: String::new(),
            task_progress: 0.0,
            task_remaining: 0.0,
            first_nozzle_temperature: 0.0,
            second_nozzle_temperature: 0.0,
            chamber_temperature: 0.0,
            bed_temperature: 0.0,
            events: Vec::new(),
            pause_reason: PauseReason::empty(),
            stop_reason: StopReason::empty(),
            ready: false,
            preheat_state: false,
            events_require_upgrade: false,
        }
    }
}

/// Decodes a live-state response frame.
///
/// `printer_type` drives the series-2 event override and `supports_utf8`
/// selects the task-name text encoding; both come from the identity known
/// at the time of the query.
pub fn decode_state(
    frame: &ParsedFrame,
    printer_type: PrinterType,
    supports_utf8: bool,
) -> Result<PrinterState> {
    let data = &frame.payload[..];
    let total = data.len() + HEADER_LEN;

    let mut state = PrinterState::default();
    let first_offset: usize;
    let mut event_count: usize;
    let event_len: usize;

    match frame.protocol_major {
        0 => {
            expect_total(0, total, TOTAL_LEN_V0)?;
            first_offset = 0;
            event_count = 5;
            event_len = 4;
        }
        1 => {
            expect_total(1, total, TOTAL_LEN_V1)?;
            first_offset = 1;
            event_count = 5;
            event_len = 4;

            // Raw flag byte, before the shifted field region starts.
            state.ready = u8_at(data, 16)? != 0;
        }
        2 => {
            expect_total(2, total, TOTAL_LEN_V2)?;
            first_offset = 4;
            event_count = 10;
            event_len = 6;

            let flags = u32_at(data, 8)?;
            state.ready = flags & 0x1 != 0;
            state.preheat_state = flags & 0x2 != 0;
        }
        other => {
            return Err(Error::decode(format!(
                "unsupported protocol major {other} in state payload"
            )))
        }
    }

    // The event region is known-broken on series-2 hardware with these
    // protocol versions; whatever bytes it holds must not be surfaced.
    if matches!(frame.protocol_major, 1 | 2) && printer_type.is_series_2() {
        state.events_require_upgrade = true;
        event_count = 0;
    }

    state.state = NetPrinterState::from_raw(i32_at(data, 0)?);
    state.status = NetPrinterStatus::from_raw(i32_at(data, 4)?);

    // Field offsets below are unshifted frame positions; `at` rebases
    // them onto the payload and applies this major's shift.
    let at = |offset: usize| offset + first_offset - HEADER_LEN;

    state.task_name = text::decode_padded(supports_utf8, slice_at(data, at(16), 255)?)?;
    state.task_progress = f32_at(data, at(275))?;
    state.task_remaining = u32_at(data, at(287))? as f32;
    state.first_nozzle_temperature = f32_at(data, at(295))?;
    state.second_nozzle_temperature = f32_at(data, at(299))?;
    state.chamber_temperature = f32_at(data, at(303))?;
    state.bed_temperature = f32_at(data, at(307))?;
    state.pause_reason = PauseReason::from_bits_retain(u32_at(data, at(335))?);
    state.stop_reason = StopReason::from_bits_retain(u32_at(data, at(339))?);

    let mut slot_offset = at(315);
    for _ in 0..event_count {
        let slot = slice_at(data, slot_offset, event_len)?;
        let event = match frame.protocol_major {
            2 => parse_event_v2(slot)?,
            _ => parse_event_legacy(slot)?,
        };
        if let Some(event) = event {
            state.events.push(event);
        }
        slot_offset += event_len;
    }

    Ok(state)
}

/// Majors 0 and 1: a slot is one signed event id, nothing else.
fn parse_event_legacy(slot: &[u8]) -> Result<Option<EventData>> {
    let id = i32_at(slot, 0)?;
    if id <= 0 {
        return Ok(None);
    }
    Ok(Some(EventData {
        code: id,
        severity: EventSeverity::Unknown,
        source: EventSource::Unknown,
        timestamp: 0,
    }))
}

/// Major 2: a bit-packed 16-bit id followed by a 32-bit timestamp.
///
/// Bits of the id: severity in the low 3, code in bits 3-9, source in
/// bits 10-15. The remaining bits are reserved padding.
fn parse_event_v2(slot: &[u8]) -> Result<Option<EventData>> {
    let id = u16_at(slot, 0)?;
    if id == 0 {
        return Ok(None);
    }
    Ok(Some(EventData {
        code: ((id >> 3) & 0x7F) as i32,
        severity: EventSeverity::from_raw((id & 0x7) as i32),
        source: EventSource::from_raw(((id >> 10) & 0x3F) as i32),
        timestamp: u32_at(slot, 2)?,
    }))
}

fn expect_total(major: u8, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(Error::decode(format!(
            "payload size mismatch for protocol major {major}: {actual} != {expected}"
        )));
    }
    Ok(())
}

fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    data.get(offset..offset + len).ok_or_else(|| {
        Error::decode(format!(
            "field of {len} bytes at offset {offset} overruns {}-byte payload",
            data.len()
        ))
    })
}

fn u8_at(data: &[u8], offset: usize) -> Result<u8> {
    Ok(slice_at(data, offset, 1)?[0])
}

fn u16_at(data: &[u8], offset: usize) -> Result<u16> {
    let raw = slice_at(data, offset, 2)?;
    Ok(u16::from_le_bytes([raw[0], raw[1]]))
}

fn i32_at(data: &[u8], offset: usize) -> Result<i32> {
    let raw = slice_at(data, offset, 4)?;
    Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn u32_at(data: &[u8], offset: usize) -> Result<u32> {
    let raw = slice_at(data, offset, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn f32_at(data: &[u8], offset: usize) -> Result<f32> {
    Ok(f32::from_bits(u32_at(data, offset)?))
}
