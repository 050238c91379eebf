//! Serial byte-stream transport for Firmata-style firmware communication.
//!
//! A [`SerialTransport`] opens a serial line, collects received bytes into a
//! thread-safe FIFO, notifies listeners once per byte, and offers
//! non-blocking `read`/`available`/`clear` plus direct writes. The device
//! itself sits behind the [`PortHandle`] trait: [`NativePort`] for OS serial
//! ports, [`VirtualPort`] for in-memory use.
//!
//! ```no_run
//! use std::sync::Arc;
//! use firmata_serial::{SerialConfig, SerialTransport};
//!
//! let transport = SerialTransport::native(SerialConfig::new("/dev/ttyACM0", 57600));
//! transport.add_listener(Arc::new(|t: &SerialTransport| {
//!     while let Some(byte) = t.read_byte() {
//!         println!("{:02x}", byte);
//!     }
//! }));
//! transport.start()?;
//! transport.write(&[0xF0, 0x79, 0xF7])?;
//! # Ok::<(), firmata_serial::SerialError>(())
//! ```

#[macro_use]
pub mod logging;

pub mod io;
pub mod settings;

pub use io::serial::{
    ChannelListener, ConfigError, DataBits, DataReceived, Parity, PortHandle, PortKind, RxHandler,
    SerialConfig, SerialError, SerialListener, SerialPortInfo, SerialTransport, StopBits,
    UsbIdentity, VirtualPort, EMPTY,
};
#[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
pub use io::serial::{list_serial_ports, NativePort};
