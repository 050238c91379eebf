// src/io/serial/config.rs
//
// Serial line parameters.
// Typed at the API boundary; loose inputs (chars, ints, floats, JSON profiles)
// fall back to defaults, strict parsing reports a ConfigError instead.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

pub const DEFAULT_PORT: &str = "COM1";
pub const DEFAULT_BAUD_RATE: u32 = 9600;

// ============================================================================
// Parity
// ============================================================================

/// Parity setting for serial port configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
    Mark,
    Space,
}

impl Parity {
    /// Map a single-letter parity code ('N', 'O', 'E', 'M', 'S').
    /// Codes are case-sensitive; anything else, lowercase letters included,
    /// is treated as no parity.
    pub fn from_symbol(symbol: char) -> Self {
        match symbol {
            'O' => Parity::Odd,
            'E' => Parity::Even,
            'M' => Parity::Mark,
            'S' => Parity::Space,
            _ => Parity::None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
            Parity::Mark => 'M',
            Parity::Space => 'S',
        }
    }
}

impl FromStr for Parity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "n" => Ok(Parity::None),
            "odd" | "o" => Ok(Parity::Odd),
            "even" | "e" => Ok(Parity::Even),
            "mark" | "m" => Ok(Parity::Mark),
            "space" | "s" => Ok(Parity::Space),
            _ => Err(ConfigError::InvalidParity(s.to_string())),
        }
    }
}

// ============================================================================
// Data bits
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl DataBits {
    /// Anything other than 5, 6 or 7 becomes eight data bits.
    pub fn from_bits(bits: i64) -> Self {
        match bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = ConfigError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5..=8 => Ok(DataBits::from_bits(bits as i64)),
            _ => Err(ConfigError::InvalidDataBits(bits.to_string())),
        }
    }
}

impl From<DataBits> for u8 {
    fn from(bits: DataBits) -> Self {
        bits.bits()
    }
}

// ============================================================================
// Stop bits
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub enum StopBits {
    #[default]
    One,
    OneAndHalf,
    Two,
}

impl StopBits {
    /// 1.5 and 2 are recognised, everything else is one stop bit.
    pub fn from_value(value: f32) -> Self {
        if value == 1.5 {
            StopBits::OneAndHalf
        } else if value == 2.0 {
            StopBits::Two
        } else {
            StopBits::One
        }
    }

    pub fn value(&self) -> f32 {
        match self {
            StopBits::One => 1.0,
            StopBits::OneAndHalf => 1.5,
            StopBits::Two => 2.0,
        }
    }
}

impl TryFrom<f32> for StopBits {
    type Error = ConfigError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        if value == 1.0 || value == 1.5 || value == 2.0 {
            Ok(StopBits::from_value(value))
        } else {
            Err(ConfigError::InvalidStopBits(value.to_string()))
        }
    }
}

impl From<StopBits> for f32 {
    fn from(bits: StopBits) -> Self {
        bits.value()
    }
}

impl FromStr for StopBits {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: f32 = s
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidStopBits(s.to_string()))?;
        StopBits::try_from(value)
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopBits::One => write!(f, "1"),
            StopBits::OneAndHalf => write!(f, "1.5"),
            StopBits::Two => write!(f, "2"),
        }
    }
}

// ============================================================================
// SerialConfig
// ============================================================================

/// Serial port configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub data_bits: DataBits,
    #[serde(default)]
    pub stop_bits: StopBits,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
        }
    }
}

impl SerialConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Default port at the given baud rate
    pub fn with_baud_rate(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Given port at the default baud rate
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(port, DEFAULT_BAUD_RATE)
    }

    /// Build from loosely-typed line parameters.
    /// Unrecognised parity, data bits or stop bits fall back to N, 8 and 1.
    pub fn from_loose(
        port: impl Into<String>,
        baud_rate: u32,
        parity: char,
        data_bits: i64,
        stop_bits: f32,
    ) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            parity: Parity::from_symbol(parity),
            data_bits: DataBits::from_bits(data_bits),
            stop_bits: StopBits::from_value(stop_bits),
        }
    }

    /// Build from a connection profile map (`port`, `baud_rate`, `parity`,
    /// `data_bits`, `stop_bits`). Numbers may also be given as strings.
    /// Only a missing port is an error; other fields default silently.
    pub fn from_profile(connection: &HashMap<String, serde_json::Value>) -> Result<Self, ConfigError> {
        let port = connection
            .get("port")
            .and_then(|v| v.as_str())
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingPort)?;

        let baud_rate = connection
            .get("baud_rate")
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .filter(|b| *b > 0 && *b <= u32::MAX as i64)
            .unwrap_or(DEFAULT_BAUD_RATE as i64) as u32;

        let parity = connection
            .get("parity")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Parity>().ok())
            .unwrap_or_default();

        let data_bits = connection
            .get("data_bits")
            .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .map(DataBits::from_bits)
            .unwrap_or_default();

        let stop_bits = connection
            .get("stop_bits")
            .and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .map(|v| StopBits::from_value(v as f32))
            .unwrap_or_default();

        Ok(Self {
            port: port.to_string(),
            baud_rate,
            parity,
            data_bits,
            stop_bits,
        })
    }

    /// Reject configurations no port could accept
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::MissingPort);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidBaudRate(self.baud_rate.to_string()));
        }
        Ok(())
    }

    /// Conventional "8-N-1" style summary of the line settings
    pub fn line_settings(&self) -> String {
        format!("{}-{}-{}", self.data_bits.bits(), self.parity.symbol(), self.stop_bits)
    }
}

// ============================================================================
// Tests
// ============================================================================
