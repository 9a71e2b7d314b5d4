//! Identity payload decoding
//!
//! The identity response carries hardware and firmware versions, the
//! printer's name, serial and MAC, and the per-toolhead configuration.
//! Field widths depend on the protocol minor version, which is why the
//! payload is parsed with a forward-only cursor rather than a fixed
//! offset table. Version fields come first, so the utf8 capability used
//! to decode the text fields is known by the time they are reached.

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::core::{NozzleType, PrinterType, Result};
use crate::protocol::capability::{self, Capabilities, VersionInfo};
use crate::protocol::text;
use crate::util::{hex_dump, Cursor};

/// Per-toolhead attributes reported in the identity payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Toolhead {
    pub name: String,
    pub nozzle_type: NozzleType,
    pub profile_name: String,
}

/// Identity and version attributes of one printer.
///
/// Updated in place by [`apply_identity`](PrinterInfo::apply_identity).
/// When a decode fails partway through, fields applied before the failure
/// keep their new values; the caller must treat the printer as unusable
/// until the next successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub hw_version_major: i8,
    pub hw_version_minor: i8,
    pub fw_version_major: i8,
    pub fw_version_minor: i16,
    pub fw_version_revision: i8,
    name: String,
    serial: String,
    mac: String,
    pub first_toolhead: Toolhead,
    pub second_toolhead: Toolhead,
    capabilities: Capabilities,
}

impl Default for PrinterInfo {
    fn default() -> Self {
        PrinterInfo {
            protocol_major: 0,
            protocol_minor: 0,
            hw_version_major: -1,
            hw_version_minor: -1,
            fw_version_major: 0,
            fw_version_minor: 0,
            fw_version_revision: 0,
            name: String::new(),
            serial: String::new(),
            mac: String::new(),
            first_toolhead: Toolhead::default(),
            second_toolhead: Toolhead::default(),
            capabilities: Capabilities::default(),
        }
    }
}

impl PrinterInfo {
    /// Decodes an identity payload into a fresh `PrinterInfo`
    pub fn from_identity(protocol_major: u8, protocol_minor: u8, data: &[u8]) -> Result<Self> {
        let mut info = PrinterInfo::default();
        info.apply_identity(protocol_major, protocol_minor, data)?;
        Ok(info)
    }

    /// Applies an identity payload to this printer.
    ///
    /// On failure the raw payload is logged as hex for field diagnosis of
    /// unseen firmware layouts, then the error propagates. Fields decoded
    /// before the failure remain applied.
    pub fn apply_identity(
        &mut self,
        protocol_major: u8,
        protocol_minor: u8,
        data: &[u8],
    ) -> Result<()> {
        self.protocol_major = protocol_major;
        self.protocol_minor = protocol_minor;

        if let Err(err) = self.apply_fields(protocol_minor, data) {
            error!(
                error = %err,
                payload = %hex_dump(data),
                "severe decoding error when applying identity payload"
            );
            return Err(err);
        }

        self.capabilities = Capabilities::detect(&self.version_info());
        Ok(())
    }

    fn apply_fields(&mut self, protocol_minor: u8, data: &[u8]) -> Result<()> {
        let mut cursor = Cursor::new(data);

        self.hw_version_minor = cursor.i8()?;
        self.hw_version_major = cursor.i8()?;

        // Firmware field widths changed twice across protocol minors.
        match protocol_minor {
            0 => self.fw_version_minor = cursor.i8()? as i16,
            1 => self.fw_version_minor = cursor.i16_le()?,
            _ => {
                self.fw_version_revision = cursor.i8()?;
                self.fw_version_minor = cursor.i8()? as i16;
            }
        }
        self.fw_version_major = cursor.i8()?;

        let utf8 = capability::supports_utf8(&self.version_info());

        self.name = text::decode_padded(utf8, cursor.bytes(20)?)?;
        self.serial = text::decode_padded(utf8, cursor.bytes(50)?)?;
        self.mac = format_mac(cursor.bytes(6)?);

        apply_toolhead(utf8, &mut cursor, &mut self.first_toolhead)?;
        apply_toolhead(utf8, &mut cursor, &mut self.second_toolhead)?;

        Ok(())
    }

    /// Version tuple feeding the capability gate
    pub fn version_info(&self) -> VersionInfo {
        VersionInfo {
            protocol_major: self.protocol_major,
            protocol_minor: self.protocol_minor,
            fw_major: self.fw_version_major,
            fw_minor: self.fw_version_minor,
            fw_revision: self.fw_version_revision,
        }
    }

    /// Feature flags cached at the last identity refresh
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// User-assigned printer name, falling back to the serial number
    pub fn name(&self) -> &str {
        if self.name.is_empty() {
            &self.serial
        } else {
            &self.name
        }
    }

    /// Serial number; empty on legacy firmware that does not report one
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// MAC address as colon-separated hex
    pub fn mac(&self) -> &str {
        &self.mac
    }

    /// Hardware version as "major.minor"
    pub fn hardware_version(&self) -> String {
        format!("{}.{}", self.hw_version_major, self.hw_version_minor)
    }

    /// Firmware version string.
    ///
    /// Only protocol major 1 reports a firmware version; the revision
    /// component exists from protocol minor 2 on.
    pub fn firmware_version(&self) -> Option<String> {
        if self.protocol_major != 1 {
            return None;
        }
        Some(if self.protocol_minor <= 1 {
            format!("{}.{}", self.fw_version_major, self.fw_version_minor)
        } else {
            format!(
                "{}.{}.{}",
                self.fw_version_major, self.fw_version_minor, self.fw_version_revision
            )
        })
    }

    /// Hardware model family
    pub fn printer_type(&self) -> PrinterType {
        PrinterType::from_hw_major(self.hw_version_major)
    }
}

fn apply_toolhead(utf8: bool, cursor: &mut Cursor<'_>, toolhead: &mut Toolhead) -> Result<()> {
    toolhead.name = text::decode_padded(utf8, cursor.bytes(10)?)?;
    toolhead.nozzle_type = NozzleType::from_code(cursor.i8()?);
    toolhead.profile_name = text::decode_padded(utf8, cursor.bytes(40)?)?;
    Ok(())
}

/// Renders six raw MAC bytes as colon-separated lowercase hex
pub fn format_mac(raw: &[u8]) -> String {
    raw.iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;

    fn padded(value: &str, width: usize) -> Vec<u8> {
        text::to_fixed_field(value.as_bytes(), width)
    }

    /// Builds an identity payload for the given protocol minor version.
    fn identity_payload(
        protocol_minor: u8,
        hw_major: i8,
        fw: (i8, i8, i8),
        name: &str,
        serial: &str,
        nozzle_code: i8,
    ) -> Vec<u8> {
        let (fw_major, fw_minor, fw_revision) = fw;
        let mut data = vec![1u8, hw_major as u8];
        match protocol_minor {
            0 => data.push(fw_minor as u8),
            1 => data.extend_from_slice(&(fw_minor as i16).to_le_bytes()),
            _ => {
                data.push(fw_revision as u8);
                data.push(fw_minor as u8);
            }
        }
        data.push(fw_major as u8);
        data.extend_from_slice(&padded(name, 20));
        data.extend_from_slice(&padded(serial, 50));
        data.extend_from_slice(&[0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]);
        for _ in 0..2 {
            data.extend_from_slice(&padded("PLA 1.75", 10));
            data.push(nozzle_code as u8);
            data.extend_from_slice(&padded("Standard", 40));
        }
        data
    }

    #[test]
    fn test_decode_minor_zero() {
        let payload = identity_payload(0, 7, (5, 8, 0), "Lab printer", "DX-001", 40);
        let info = PrinterInfo::from_identity(1, 0, &payload).unwrap();

        assert_eq!(info.hw_version_minor, 1);
        assert_eq!(info.hw_version_major, 7);
        assert_eq!(info.fw_version_major, 5);
        assert_eq!(info.fw_version_minor, 8);
        assert_eq!(info.fw_version_revision, 0);
        assert_eq!(info.printer_type(), PrinterType::DesignerX);
        assert_eq!(info.name(), "Lab printer");
        assert_eq!(info.serial(), "DX-001");
        assert_eq!(info.mac(), "00:1a:2b:3c:4d:5e");
        assert_eq!(info.first_toolhead.nozzle_type, NozzleType::Size0_4);
        assert_eq!(info.firmware_version().unwrap(), "5.8");
    }

    #[test]
    fn test_decode_minor_one_wide_firmware_minor() {
        // Protocol minor 1 carries the firmware minor as two bytes,
        // which is what makes firmware 5.220 representable.
        let mut data = vec![2u8, 9u8];
        data.extend_from_slice(&220i16.to_le_bytes());
        data.push(5);
        data.extend_from_slice(&padded("", 20));
        data.extend_from_slice(&padded("XLP-42", 50));
        data.extend_from_slice(&[0xaa; 6]);
        for _ in 0..2 {
            data.extend_from_slice(&padded("", 10));
            data.push(0xff); // -1, no nozzle
            data.extend_from_slice(&padded("", 40));
        }

        let info = PrinterInfo::from_identity(1, 1, &data).unwrap();
        assert_eq!(info.fw_version_minor, 220);
        assert_eq!(info.fw_version_major, 5);
        assert!(info.capabilities().profiles);
        assert_eq!(info.firmware_version().unwrap(), "5.220");
        assert_eq!(info.first_toolhead.nozzle_type, NozzleType::None);
        // Name falls back to the serial when unset.
        assert_eq!(info.name(), "XLP-42");
    }

    #[test]
    fn test_decode_minor_two_revision_before_minor() {
        let payload = identity_payload(2, 14, (6, 1, 33), "Shop", "XP2-7", 20);
        let info = PrinterInfo::from_identity(1, 2, &payload).unwrap();

        assert_eq!(info.fw_version_revision, 33);
        assert_eq!(info.fw_version_minor, 1);
        assert_eq!(info.fw_version_major, 6);
        assert_eq!(info.firmware_version().unwrap(), "6.1.33");
        assert!(info.capabilities().utf8_text);
        assert!(info.capabilities().preheat_journal);
        assert!(info.printer_type().is_series_2());
    }

    #[test]
    fn test_unknown_nozzle_code_preserved() {
        let payload = identity_payload(2, 7, (6, 0, 0), "P", "S", 99);
        let info = PrinterInfo::from_identity(1, 2, &payload).unwrap();
        assert_eq!(info.first_toolhead.nozzle_type, NozzleType::Other(99));
        assert_eq!(info.second_toolhead.nozzle_type, NozzleType::Other(99));
    }

    #[test]
    fn test_legacy_code_page_strings() {
        // Protocol 1.0 predates UTF-8 support, so text is Windows-1251.
        let name_1251 = text::encode_text(false, "Принтер");
        let mut payload = identity_payload(0, 6, (4, 0, 0), "", "S-1", 40);
        payload[4..4 + name_1251.len()].copy_from_slice(&name_1251);

        let info = PrinterInfo::from_identity(1, 0, &payload).unwrap();
        assert!(!info.capabilities().utf8_text);
        assert_eq!(info.name(), "Принтер");
    }

    #[test]
    fn test_truncated_payload_keeps_applied_fields() {
        let full = identity_payload(2, 7, (6, 0, 0), "Kept", "KEPT-1", 40);
        let mut info = PrinterInfo::default();
        // Cut inside the serial field: versions and name decode first.
        let err = info.apply_identity(1, 2, &full[..40]).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));

        assert_eq!(info.protocol_major, 1);
        assert_eq!(info.hw_version_major, 7);
        assert_eq!(info.fw_version_major, 6);
        assert_eq!(info.name, "Kept");
        assert_eq!(info.serial(), "");
    }

    #[test]
    fn test_no_firmware_version_outside_major_one() {
        let payload = identity_payload(0, 6, (4, 0, 0), "P", "S", 40);
        let info = PrinterInfo::from_identity(2, 0, &payload).unwrap();
        assert_eq!(info.firmware_version(), None);
    }

    #[test]
    fn test_info_serializes() {
        let payload = identity_payload(2, 7, (6, 0, 0), "P", "S", 40);
        let info = PrinterInfo::from_identity(1, 2, &payload).unwrap();
        let json = serde_json::to_string(&info).unwrap();
        let back: PrinterInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
