// src/io/serial/transport.rs
//
// SerialTransport: the byte-stream contract offered to protocol layers.
// Composes a PortHandle, the reception buffer and the listener registry.

use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use super::buffer::ReceptionBuffer;
use super::config::SerialConfig;
use super::error::SerialError;
use super::listeners::{ListenerRegistry, SerialListener};
use super::port::{PortHandle, RxHandler};

/// Returned by `read()` when no byte is buffered
pub const EMPTY: i32 = -1;

struct TransportInner {
    config: SerialConfig,
    port: Arc<dyn PortHandle>,
    buffer: ReceptionBuffer,
    listeners: ListenerRegistry,
    stopping: AtomicBool,
}

/// Serial transport handle.
///
/// Cloning is cheap and every clone refers to the same port and buffer; the
/// listener callback receives one of these.
///
/// `start()` and `stop()` should not be raced from different threads. The
/// port handles tolerate it, but which call wins is unspecified.
#[derive(Clone)]
pub struct SerialTransport {
    inner: Arc<TransportInner>,
}

impl SerialTransport {
    pub fn new(config: SerialConfig, port: Arc<dyn PortHandle>) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                config,
                port,
                buffer: ReceptionBuffer::new(),
                listeners: ListenerRegistry::new(),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    /// Transport over the OS serial device named in `config`
    #[cfg(any(target_os = "windows", target_os = "macos", target_os = "linux"))]
    pub fn native(config: SerialConfig) -> Self {
        let port = Arc::new(super::native::NativePort::new(config.port.clone()));
        Self::new(config, port)
    }

    pub fn config(&self) -> &SerialConfig {
        &self.inner.config
    }

    pub fn port_name(&self) -> &str {
        self.inner.port.name()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Open the port and start feeding received bytes into the buffer.
    /// On failure the transport stays closed. A configuration no port could
    /// accept (empty name, zero baud rate) is refused as `OpenFailed`
    /// without touching the device.
    pub fn start(&self) -> Result<(), SerialError> {
        self.inner
            .config
            .validate()
            .map_err(|e| SerialError::open_failed(&self.inner.config.port, e))?;
        self.inner.stopping.store(false, Ordering::SeqCst);

        // Weak so the port's handler does not keep the transport alive
        let weak = Arc::downgrade(&self.inner);
        let handler: RxHandler = Arc::new(move |available: usize| {
            if let Some(inner) = weak.upgrade() {
                let transport = SerialTransport { inner };
                if let Err(e) = transport.handle_rx(available) {
                    crate::port_log!(transport.port_name(), "Error handling serial event: {}", e);
                }
            }
        });

        self.inner.port.open(&self.inner.config, handler)
    }

    /// Close the port. `is_stopping()` turns true before the close is
    /// attempted, so it holds even if closing fails.
    pub fn stop(&self) -> Result<(), SerialError> {
        self.inner.stopping.store(true, Ordering::SeqCst);
        self.inner.port.close()
    }

    pub fn is_stopping(&self) -> bool {
        self.inner.stopping.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.inner.port.is_open()
    }

    // ------------------------------------------------------------------------
    // I/O
    // ------------------------------------------------------------------------

    /// Write bytes straight to the port. Nothing is queued; a failure is
    /// reported as is.
    pub fn write(&self, bytes: &[u8]) -> Result<(), SerialError> {
        self.inner.port.write_raw(bytes)
    }

    pub fn write_byte(&self, byte: u8) -> Result<(), SerialError> {
        self.inner.port.write_raw(&[byte])
    }

    /// Pop the oldest received byte as 0..=255, or `EMPTY` (-1).
    pub fn read(&self) -> i32 {
        self.read_byte().map(i32::from).unwrap_or(EMPTY)
    }

    pub fn read_byte(&self) -> Option<u8> {
        self.inner.buffer.pop_front()
    }

    /// Discard everything received so far
    pub fn clear(&self) {
        self.inner.buffer.clear();
    }

    /// Number of received bytes waiting to be read
    pub fn available(&self) -> usize {
        self.inner.buffer.len()
    }

    // ------------------------------------------------------------------------
    // Listeners
    // ------------------------------------------------------------------------

    pub fn add_listener(&self, listener: Arc<dyn SerialListener>) {
        self.inner.listeners.add(listener);
    }

    /// Safe to call from inside a listener callback.
    pub fn remove_listener(&self, listener: &Arc<dyn SerialListener>) -> bool {
        self.inner.listeners.remove(listener)
    }

    // ------------------------------------------------------------------------
    // Receive events
    // ------------------------------------------------------------------------

    /// Runs on the port's notification thread. A failed read drops this
    /// notification; the port stays open for the next one.
    ///
    /// A notification can race `stop()` and find the port already closed.
    /// Read errors are not reported once stopping has begun.
    fn handle_rx(&self, available: usize) -> Result<(), SerialError> {
        let bytes = match self.inner.port.read_raw(available) {
            Ok(bytes) => bytes,
            Err(_) if self.is_stopping() => return Ok(()),
            Err(e) => return Err(e),
        };

        for byte in bytes {
            self.inner.buffer.push(byte);
            self.inner.listeners.notify_all(self);
        }
        Ok(())
    }
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port_name())
            .field("open", &self.is_open())
            .field("stopping", &self.is_stopping())
            .field("available", &self.available())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
