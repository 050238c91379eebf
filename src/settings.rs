// src/settings.rs
//
// Settings file loading. A TOML file with a [serial] table and an optional
// log directory:
//
//   log_dir = "/var/log/firmata"
//
//   [serial]
//   port = "/dev/ttyACM0"
//   baud_rate = 57600
//   parity = "none"
//   data_bits = 8
//   stop_bits = 1

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::io::serial::{ConfigError, SerialConfig};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub serial: SerialConfig,
    /// Directory for log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// Parse and validate settings from TOML text
pub fn parse_settings(text: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = toml::from_str(text)?;
    settings.serial.validate()?;
    Ok(settings)
}

pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_settings(&text)
}

/// Load only the serial configuration from a settings file
pub fn load_config(path: &Path) -> Result<SerialConfig, ConfigError> {
    Ok(load_settings(path)?.serial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::serial::{DataBits, Parity, StopBits};

    #[test]
    fn test_parse_full_settings() {
        let settings = parse_settings(
            r#"
            log_dir = "/tmp/firmata"

            [serial]
            port = "/dev/ttyACM0"
            baud_rate = 57600
            parity = "even"
            data_bits = 7
            stop_bits = 2
            "#,
        )
        .unwrap();

        assert_eq!(settings.log_dir, Some(PathBuf::from("/tmp/firmata")));
        assert_eq!(settings.serial.port, "/dev/ttyACM0");
        assert_eq!(settings.serial.baud_rate, 57600);
        assert_eq!(settings.serial.parity, Parity::Even);
        assert_eq!(settings.serial.data_bits, DataBits::Seven);
        assert_eq!(settings.serial.stop_bits, StopBits::Two);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings = parse_settings("[serial]\nport = \"COM3\"\n").unwrap();
        assert_eq!(settings.log_dir, None);
        assert_eq!(settings.serial, SerialConfig::with_port("COM3"));
    }

    #[test]
    fn test_fractional_stop_bits() {
        let settings = parse_settings("[serial]\nport = \"COM3\"\nstop_bits = 1.5\n").unwrap();
        assert_eq!(settings.serial.stop_bits, StopBits::OneAndHalf);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            parse_settings("[serial]\nport = \"COM3\"\nparity = \"sideways\"\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            parse_settings("[serial]\nport = \"COM3\"\ndata_bits = 9\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            parse_settings("[serial]\nport = \"COM3\"\nbaud_rate = 0\n"),
            Err(ConfigError::InvalidBaudRate(_))
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let path = std::env::temp_dir().join(format!("firmata-serial-settings-{}.toml", std::process::id()));
        std::fs::write(&path, "[serial]\nport = \"/dev/ttyUSB1\"\nbaud_rate = 115200\n").unwrap();

        let config = load_config(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(config.port, "/dev/ttyUSB1");
        assert_eq!(config.baud_rate, 115200);

        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }
}
