// src/io/serial/port.rs
//
// The capability a serial device must offer to sit under a SerialTransport.

use std::sync::Arc;

use serde::Serialize;

use super::config::SerialConfig;
use super::error::SerialError;

/// Receive-event handler. Called with the number of newly available bytes,
/// usually from a thread owned by the port rather than the caller's thread.
pub type RxHandler = Arc<dyn Fn(usize) + Send + Sync>;

/// Owner of one serial device.
///
/// Implementations use interior mutability so a single handle can be shared
/// between the caller's thread and the notification thread.
pub trait PortHandle: Send + Sync {
    /// Open the device, apply the line parameters and start delivering
    /// receive notifications to `handler`.
    fn open(&self, config: &SerialConfig, handler: RxHandler) -> Result<(), SerialError>;

    /// Release the device. Closing an already closed port succeeds.
    fn close(&self) -> Result<(), SerialError>;

    /// Drain up to `max_bytes` bytes already buffered by the driver.
    fn read_raw(&self, max_bytes: usize) -> Result<Vec<u8>, SerialError>;

    /// Write all bytes to the wire.
    fn write_raw(&self, bytes: &[u8]) -> Result<(), SerialError>;

    fn is_open(&self) -> bool;

    /// Device name used in logs and errors
    fn name(&self) -> &str;
}

/// How an enumerated port is attached to the machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Usb,
    Bluetooth,
    Pci,
    Unknown,
}

/// USB descriptor data, which is how a board is usually recognised
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UsbIdentity {
    pub vid: u16,
    pub pid: u16,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
}

impl UsbIdentity {
    /// `vid:pid` in the lowercase hex form used by lsusb and board lists
    pub fn id(&self) -> String {
        format!("{:04x}:{:04x}", self.vid, self.pid)
    }
}

/// A serial device found on the system
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SerialPortInfo {
    pub port_name: String,
    pub kind: PortKind,
    pub usb: Option<UsbIdentity>,
}

impl SerialPortInfo {
    #[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
    pub fn from_port_info(info: serialport::SerialPortInfo) -> Self {
        use serialport::SerialPortType;

        let (kind, usb) = match info.port_type {
            SerialPortType::UsbPort(usb) => (
                PortKind::Usb,
                Some(UsbIdentity {
                    vid: usb.vid,
                    pid: usb.pid,
                    manufacturer: usb.manufacturer,
                    product: usb.product,
                    serial_number: usb.serial_number,
                }),
            ),
            SerialPortType::BluetoothPort => (PortKind::Bluetooth, None),
            SerialPortType::PciPort => (PortKind::Pci, None),
            SerialPortType::Unknown => (PortKind::Unknown, None),
        };
        Self { port_name: info.port_name, kind, usb }
    }

    /// One-line summary, e.g. `/dev/ttyACM0  usb 2341:0043 Arduino Uno (85734323)`
    pub fn describe(&self) -> String {
        let kind = match self.kind {
            PortKind::Usb => "usb",
            PortKind::Bluetooth => "bluetooth",
            PortKind::Pci => "pci",
            PortKind::Unknown => "unknown",
        };
        let mut line = format!("{}  {}", self.port_name, kind);
        if let Some(usb) = &self.usb {
            line.push(' ');
            line.push_str(&usb.id());
            if let Some(product) = usb.product.as_ref().or(usb.manufacturer.as_ref()) {
                line.push(' ');
                line.push_str(product);
            }
            if let Some(serial) = &usb.serial_number {
                line.push_str(&format!(" ({})", serial));
            }
        }
        line
    }
}

/// macOS exposes every device twice. Only the /dev/cu.* side is listed: it
/// opens without waiting for carrier detect, unlike /dev/tty.*.
fn is_listed(port_name: &str) -> bool {
    !(cfg!(target_os = "macos") && port_name.starts_with("/dev/tty."))
}

/// Enumerate the serial devices present on the system
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub fn list_serial_ports() -> Result<Vec<SerialPortInfo>, SerialError> {
    let ports = serialport::available_ports().map_err(|e| SerialError::EnumerationFailed { source: e.into() })?;

    Ok(ports
        .into_iter()
        .filter(|p| is_listed(&p.port_name))
        .map(SerialPortInfo::from_port_info)
        .collect())
}
