// src/io/serial/utils.rs
//
// Conversion functions between our line parameters and the serialport crate.
// The native driver has no mark/space parity and no 1.5 stop bits, so those
// settings are rejected here rather than silently approximated.

use serialport::{DataBits as SpDataBits, Parity as SpParity, StopBits as SpStopBits};

use super::config::{DataBits, Parity, StopBits};

/// Convert our Parity enum to serialport crate's Parity type
pub fn to_serialport_parity(p: Parity) -> Result<SpParity, String> {
    match p {
        Parity::None => Ok(SpParity::None),
        Parity::Odd => Ok(SpParity::Odd),
        Parity::Even => Ok(SpParity::Even),
        Parity::Mark | Parity::Space => {
            Err(format!("{:?} parity is not supported by the native serial driver", p))
        }
    }
}

/// Convert data bits to serialport crate's DataBits type
pub fn to_serialport_data_bits(bits: DataBits) -> SpDataBits {
    match bits {
        DataBits::Five => SpDataBits::Five,
        DataBits::Six => SpDataBits::Six,
        DataBits::Seven => SpDataBits::Seven,
        DataBits::Eight => SpDataBits::Eight,
    }
}

/// Convert stop bits to serialport crate's StopBits type
pub fn to_serialport_stop_bits(bits: StopBits) -> Result<SpStopBits, String> {
    match bits {
        StopBits::One => Ok(SpStopBits::One),
        StopBits::Two => Ok(SpStopBits::Two),
        StopBits::OneAndHalf => {
            Err("1.5 stop bits are not supported by the native serial driver".to_string())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_serialport_parity() {
        assert!(matches!(to_serialport_parity(Parity::None), Ok(SpParity::None)));
        assert!(matches!(to_serialport_parity(Parity::Odd), Ok(SpParity::Odd)));
        assert!(matches!(to_serialport_parity(Parity::Even), Ok(SpParity::Even)));
        assert!(to_serialport_parity(Parity::Mark).is_err());
        assert!(to_serialport_parity(Parity::Space).is_err());
    }

    #[test]
    fn test_to_serialport_data_bits() {
        assert!(matches!(to_serialport_data_bits(DataBits::Five), SpDataBits::Five));
        assert!(matches!(to_serialport_data_bits(DataBits::Six), SpDataBits::Six));
        assert!(matches!(to_serialport_data_bits(DataBits::Seven), SpDataBits::Seven));
        assert!(matches!(to_serialport_data_bits(DataBits::Eight), SpDataBits::Eight));
    }

    #[test]
    fn test_to_serialport_stop_bits() {
        assert!(matches!(to_serialport_stop_bits(StopBits::One), Ok(SpStopBits::One)));
        assert!(matches!(to_serialport_stop_bits(StopBits::Two), Ok(SpStopBits::Two)));
        assert!(to_serialport_stop_bits(StopBits::OneAndHalf).is_err());
    }
}
