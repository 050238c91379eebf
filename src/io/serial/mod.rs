// src/io/serial/mod.rs
//
// Serial byte-stream transport.
//
// Features:
// - Port handles for OS devices (serialport crate) and in-memory virtual ports
// - Thread-safe reception buffer fed by the port's notification thread
// - Per-byte listener notification, with an optional channel offload

mod buffer;
pub mod config;
pub mod error;
mod listeners;
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
mod native;
pub mod port;
mod transport;
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub(crate) mod utils;
mod virtual_port;

pub use buffer::ReceptionBuffer;
pub use config::{DataBits, Parity, SerialConfig, StopBits};
pub use error::{ConfigError, DriverError, SerialError};
pub use listeners::{ChannelListener, DataReceived, ListenerRegistry, SerialListener};
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub use native::NativePort;
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub use port::list_serial_ports;
pub use port::{PortHandle, PortKind, RxHandler, SerialPortInfo, UsbIdentity};
pub use transport::{SerialTransport, EMPTY};
pub use virtual_port::VirtualPort;
