//! Version-gated feature detection
//!
//! Printers do not advertise features explicitly. Each capability is a
//! pure function of the protocol and firmware version tuple, compared
//! lexicographically against the firmware release that introduced the
//! feature. Capabilities are computed once per identity refresh and
//! cached until the next one.

use serde::{Deserialize, Serialize};

/// Version fields a capability decision is based on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub protocol_major: u8,
    pub protocol_minor: u8,
    pub fw_major: i8,
    pub fw_minor: i16,
    pub fw_revision: i8,
}

/// Derived feature flags for one printer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Text fields are UTF-8 rather than the legacy code page
    pub utf8_text: bool,
    /// The filesystem-clean command is available
    pub clean_filesystem: bool,
    /// The preheat journal is available
    pub preheat_journal: bool,
    /// Per-toolhead material profiles are reported
    pub profiles: bool,
}

impl Capabilities {
    /// Evaluates every capability for the given version tuple
    pub fn detect(version: &VersionInfo) -> Self {
        Capabilities {
            utf8_text: supports_utf8(version),
            clean_filesystem: supports_clean_filesystem(version),
            preheat_journal: supports_preheat_journal(version),
            profiles: supports_profiles(version),
        }
    }
}

/// UTF-8 text fields: protocol 2+, protocol 1.3+, or protocol 1.2 with firmware 5.9+
pub fn supports_utf8(v: &VersionInfo) -> bool {
    v.protocol_major > 1
        || (v.protocol_major == 1
            && (v.protocol_minor > 2
                || (v.protocol_minor == 2
                    && (v.fw_major > 5 || (v.fw_major == 5 && v.fw_minor >= 9)))))
}

/// Filesystem clean: protocol 1.2 with firmware 5.9.58+
pub fn supports_clean_filesystem(v: &VersionInfo) -> bool {
    v.protocol_major == 1
        && v.protocol_minor == 2
        && (v.fw_major > 5
            || (v.fw_major == 5
                && (v.fw_minor > 9 || (v.fw_minor == 9 && v.fw_revision >= 58))))
}

/// Preheat journal: protocol 1.2 with firmware 6.1.33+
pub fn supports_preheat_journal(v: &VersionInfo) -> bool {
    v.protocol_major == 1
        && v.protocol_minor == 2
        && (v.fw_major > 6
            || (v.fw_major == 6
                && (v.fw_minor > 1 || (v.fw_minor == 1 && v.fw_revision >= 33))))
}

/// Material profiles: protocol 1.2, or protocol 1.0/1.1 with firmware 5.220+
pub fn supports_profiles(v: &VersionInfo) -> bool {
    v.protocol_major == 1
        && ((v.protocol_minor <= 1
            && (v.fw_major > 5 || (v.fw_major == 5 && v.fw_minor >= 220)))
            || v.protocol_minor == 2)
}
