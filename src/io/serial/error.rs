// src/io/serial/error.rs
//
// Error types for the serial transport and its configuration.

use thiserror::Error;

/// Underlying driver-level error, kept intact for diagnostics.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum SerialError {
    #[error("Failed to open {port}: {source}")]
    OpenFailed {
        port: String,
        #[source]
        source: DriverError,
    },

    #[error("Failed to close {port}: {source}")]
    CloseFailed {
        port: String,
        #[source]
        source: DriverError,
    },

    #[error("Write to {port} failed: {source}")]
    WriteFailed {
        port: String,
        #[source]
        source: DriverError,
    },

    #[error("Read from {port} failed: {source}")]
    ReadFailed {
        port: String,
        #[source]
        source: DriverError,
    },

    #[error("Failed to enumerate serial ports: {source}")]
    EnumerationFailed {
        #[source]
        source: DriverError,
    },
}

impl SerialError {
    pub fn open_failed(port: &str, source: impl Into<DriverError>) -> Self {
        SerialError::OpenFailed { port: port.to_string(), source: source.into() }
    }

    pub fn close_failed(port: &str, source: impl Into<DriverError>) -> Self {
        SerialError::CloseFailed { port: port.to_string(), source: source.into() }
    }

    pub fn write_failed(port: &str, source: impl Into<DriverError>) -> Self {
        SerialError::WriteFailed { port: port.to_string(), source: source.into() }
    }

    pub fn read_failed(port: &str, source: impl Into<DriverError>) -> Self {
        SerialError::ReadFailed { port: port.to_string(), source: source.into() }
    }

    /// Name of the port the failing operation targeted. Enumeration is not
    /// tied to a port.
    pub fn port(&self) -> Option<&str> {
        match self {
            SerialError::OpenFailed { port, .. }
            | SerialError::CloseFailed { port, .. }
            | SerialError::WriteFailed { port, .. }
            | SerialError::ReadFailed { port, .. } => Some(port),
            SerialError::EnumerationFailed { .. } => None,
        }
    }
}

/// Errors raised while loading or strictly parsing a serial configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid parity: {0}")]
    InvalidParity(String),

    #[error("Invalid data bits: {0} (expected 5, 6, 7 or 8)")]
    InvalidDataBits(String),

    #[error("Invalid stop bits: {0} (expected 1, 1.5 or 2)")]
    InvalidStopBits(String),

    #[error("Invalid baud rate: {0}")]
    InvalidBaudRate(String),

    #[error("Serial port is required")]
    MissingPort,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_driver_error_is_preserved_as_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such device");
        let err = SerialError::open_failed("/dev/ttyUSB0", io);

        assert_eq!(err.port(), Some("/dev/ttyUSB0"));
        assert!(err.to_string().contains("no such device"));
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_enumeration_failure_has_no_port() {
        let err = SerialError::EnumerationFailed { source: "sysfs unavailable".into() };
        assert_eq!(err.port(), None);
        assert_eq!(err.to_string(), "Failed to enumerate serial ports: sysfs unavailable");
    }

    #[test]
    fn test_string_sources() {
        let err = SerialError::write_failed("COM3", "port is closed");
        assert!(matches!(err, SerialError::WriteFailed { .. }));
        assert_eq!(err.to_string(), "Write to COM3 failed: port is closed");
    }
}
