use serde::{Deserialize, Serialize};

/// Hardware model family, derived from the hardware major version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrinterType {
    Unknown,
    DesignerXPro,
    DesignerPro250,
    Designer,
    DesignerX,
    DesignerXl,
    DesignerXlPro,
    DesignerClassic,
    DesignerClassicAdv,
    DesignerX2,
    DesignerXl2,
    DesignerXPro2,
    DesignerXlPro2,
}

impl PrinterType {
    /// Maps a hardware major version to the model family
    pub fn from_hw_major(value: i8) -> Self {
        match value {
            4 => PrinterType::DesignerXPro,
            5 => PrinterType::DesignerPro250,
            6 => PrinterType::Designer,
            7 => PrinterType::DesignerX,
            8 => PrinterType::DesignerXl,
            9 => PrinterType::DesignerXlPro,
            10 => PrinterType::DesignerClassic,
            11 => PrinterType::DesignerClassicAdv,
            12 => PrinterType::DesignerX2,
            13 => PrinterType::DesignerXl2,
            14 => PrinterType::DesignerXPro2,
            15 => PrinterType::DesignerXlPro2,
            _ => PrinterType::Unknown,
        }
    }

    /// Human-readable model name
    pub fn friendly_name(&self) -> &'static str {
        match self {
            PrinterType::Unknown => "Unknown",
            PrinterType::DesignerXPro => "Designer X Pro",
            PrinterType::DesignerPro250 => "Designer PRO 250",
            PrinterType::Designer => "Designer",
            PrinterType::DesignerX => "Designer X",
            PrinterType::DesignerXl => "Designer XL",
            PrinterType::DesignerXlPro => "Designer XL Pro",
            PrinterType::DesignerClassic => "Designer Classic",
            PrinterType::DesignerClassicAdv => "Designer Classic Adv",
            PrinterType::DesignerX2 => "Designer X 2",
            PrinterType::DesignerXl2 => "Designer XL 2",
            PrinterType::DesignerXPro2 => "Designer X Pro 2",
            PrinterType::DesignerXlPro2 => "Designer XL Pro 2",
        }
    }

    /// Returns true for the large-format XL models
    pub fn is_xl(&self) -> bool {
        matches!(
            self,
            PrinterType::DesignerXl
                | PrinterType::DesignerXlPro
                | PrinterType::DesignerXl2
                | PrinterType::DesignerXlPro2
        )
    }

    /// Returns true for the second hardware generation.
    ///
    /// The event-log region of the state payload is non-functional on
    /// these models regardless of protocol version.
    pub fn is_series_2(&self) -> bool {
        matches!(
            self,
            PrinterType::DesignerX2
                | PrinterType::DesignerXl2
                | PrinterType::DesignerXPro2
                | PrinterType::DesignerXlPro2
        )
    }

    /// Returns true for models with two toolheads
    pub fn is_multi_nozzle(&self) -> bool {
        matches!(
            self,
            PrinterType::DesignerPro250
                | PrinterType::DesignerXPro
                | PrinterType::DesignerXPro2
                | PrinterType::DesignerXlPro
                | PrinterType::DesignerXlPro2
        )
    }

    /// Returns true for single-toolhead models
    pub fn is_single_nozzle(&self) -> bool {
        !self.is_multi_nozzle()
    }
}

impl std::fmt::Display for PrinterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.friendly_name())
    }
}

/// Nozzle size fitted to a toolhead.
///
/// Unrecognized codes are preserved as received rather than rejected so
/// that newer hardware keeps decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NozzleType {
    #[default]
    None,
    Size0_2,
    Size0_3,
    Size0_4,
    Size0_5,
    Size0_6,
    Size0_8,
    Size1_0,
    Other(i8),
}

impl NozzleType {
    /// Maps a wire code to a nozzle size
    pub fn from_code(value: i8) -> Self {
        match value {
            -1 => NozzleType::None,
            20 => NozzleType::Size0_2,
            30 => NozzleType::Size0_3,
            40 => NozzleType::Size0_4,
            50 => NozzleType::Size0_5,
            60 => NozzleType::Size0_6,
            80 => NozzleType::Size0_8,
            100 => NozzleType::Size1_0,
            other => NozzleType::Other(other),
        }
    }

    /// Returns the wire code for this nozzle size
    pub fn code(&self) -> i8 {
        match self {
            NozzleType::None => -1,
            NozzleType::Size0_2 => 20,
            NozzleType::Size0_3 => 30,
            NozzleType::Size0_4 => 40,
            NozzleType::Size0_5 => 50,
            NozzleType::Size0_6 => 60,
            NozzleType::Size0_8 => 80,
            NozzleType::Size1_0 => 100,
            NozzleType::Other(code) => *code,
        }
    }

    /// Nozzle diameter in millimeters, when the code is recognized
    pub fn diameter_mm(&self) -> Option<f32> {
        match self {
            NozzleType::None | NozzleType::Other(_) => None,
            known => Some(known.code() as f32 / 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_type_mapping() {
        assert_eq!(PrinterType::from_hw_major(7), PrinterType::DesignerX);
        assert_eq!(PrinterType::from_hw_major(15), PrinterType::DesignerXlPro2);
        assert_eq!(PrinterType::from_hw_major(0), PrinterType::Unknown);
        assert_eq!(PrinterType::from_hw_major(-1), PrinterType::Unknown);
    }

    #[test]
    fn test_printer_type_predicates() {
        assert!(PrinterType::DesignerXl2.is_series_2());
        assert!(PrinterType::DesignerXl2.is_xl());
        assert!(!PrinterType::DesignerX.is_series_2());
        assert!(PrinterType::DesignerXPro.is_multi_nozzle());
        assert!(PrinterType::DesignerClassic.is_single_nozzle());
    }

    #[test]
    fn test_friendly_names() {
        assert_eq!(PrinterType::DesignerXPro.friendly_name(), "Designer X Pro");
        assert_eq!(PrinterType::DesignerPro250.friendly_name(), "Designer PRO 250");
        assert_eq!(PrinterType::DesignerX2.to_string(), "Designer X 2");
    }

    #[test]
    fn test_nozzle_type_round_trip() {
        assert_eq!(NozzleType::from_code(40), NozzleType::Size0_4);
        assert_eq!(NozzleType::Size0_4.code(), 40);
        assert_eq!(NozzleType::from_code(-1), NozzleType::None);
    }

    #[test]
    fn test_unknown_nozzle_code_preserved() {
        let nozzle = NozzleType::from_code(99);
        assert_eq!(nozzle, NozzleType::Other(99));
        assert_eq!(nozzle.code(), 99);
        assert_eq!(nozzle.diameter_mm(), None);
    }

    #[test]
    fn test_nozzle_diameter() {
        assert_eq!(NozzleType::Size0_4.diameter_mm(), Some(0.4));
        assert_eq!(NozzleType::Size1_0.diameter_mm(), Some(1.0));
        assert_eq!(NozzleType::None.diameter_mm(), None);
    }
}
