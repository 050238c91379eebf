// src/io/serial/native.rs
//
// PortHandle backed by an OS serial device through the serialport crate.
//
// serialport has no receive-event callback, so the handle owns a notification
// thread that polls the driver for pending bytes and hands the count to the
// registered RxHandler. Reads and writes share the device through one mutex,
// which is never held while the handler runs.

use std::io::{Read, Write};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::SerialPort;

use super::config::SerialConfig;
use super::error::SerialError;
use super::port::{PortHandle, RxHandler};
use super::utils::{to_serialport_data_bits, to_serialport_parity, to_serialport_stop_bits};

/// Minimal timeout for better byte-level timing resolution
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

type SharedPort = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

struct EventThread {
    cancel_flag: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct NativePort {
    name: String,
    poll_interval: Duration,
    port: SharedPort,
    event_thread: Mutex<Option<EventThread>>,
}

impl NativePort {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            port: Arc::new(Mutex::new(None)),
            event_thread: Mutex::new(None),
        }
    }

    /// How long the notification thread sleeps when no bytes are pending
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn open_device(&self, config: &SerialConfig) -> Result<Box<dyn SerialPort>, SerialError> {
        let parity = to_serialport_parity(config.parity)
            .map_err(|e| SerialError::open_failed(&config.port, e))?;
        let stop_bits = to_serialport_stop_bits(config.stop_bits)
            .map_err(|e| SerialError::open_failed(&config.port, e))?;
        let data_bits = to_serialport_data_bits(config.data_bits);

        serialport::new(&config.port, config.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .timeout(self.poll_interval)
            .open()
            .map_err(|e| SerialError::open_failed(&config.port, e))
    }
}

impl PortHandle for NativePort {
    fn open(&self, config: &SerialConfig, handler: RxHandler) -> Result<(), SerialError> {
        {
            let mut guard = self
                .port
                .lock()
                .map_err(|e| SerialError::open_failed(&config.port, format!("Port mutex poisoned: {}", e)))?;
            if guard.is_some() {
                return Err(SerialError::open_failed(&config.port, "port is already open"));
            }
            *guard = Some(self.open_device(config)?);
        }

        let cancel_flag = Arc::new(AtomicBool::new(false));
        let spawned = {
            let name = config.port.clone();
            let port = self.port.clone();
            let cancel_flag = cancel_flag.clone();
            let poll_interval = self.poll_interval;
            thread::Builder::new()
                .name(format!("serial-rx {}", config.port))
                .spawn(move || run_event_loop(name, port, cancel_flag, handler, poll_interval))
        };

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                if let Ok(mut guard) = self.port.lock() {
                    *guard = None;
                }
                return Err(SerialError::open_failed(&config.port, e));
            }
        };

        let mut guard = self
            .event_thread
            .lock()
            .map_err(|e| SerialError::open_failed(&config.port, format!("Event thread mutex poisoned: {}", e)))?;
        if let Some(stale) = guard.replace(EventThread { cancel_flag, handle }) {
            stale.cancel_flag.store(true, Ordering::Relaxed);
        }

        crate::port_log!(
            config.port,
            "Opened at {} baud ({})",
            config.baud_rate,
            config.line_settings()
        );
        Ok(())
    }

    fn close(&self) -> Result<(), SerialError> {
        let event_thread = self
            .event_thread
            .lock()
            .map_err(|e| SerialError::close_failed(&self.name, format!("Event thread mutex poisoned: {}", e)))?
            .take();

        if let Some(event_thread) = &event_thread {
            event_thread.cancel_flag.store(true, Ordering::Relaxed);
        }

        let released = self
            .port
            .lock()
            .map_err(|e| SerialError::close_failed(&self.name, format!("Port mutex poisoned: {}", e)))?
            .take();

        // A listener may stop the transport from the notification thread itself;
        // joining there would never return.
        if let Some(event_thread) = event_thread {
            if event_thread.handle.thread().id() != thread::current().id()
                && event_thread.handle.join().is_err()
            {
                return Err(SerialError::close_failed(&self.name, "notification thread panicked"));
            }
        }

        if released.is_some() {
            crate::port_log!(self.name, "Closed");
        }
        Ok(())
    }

    fn read_raw(&self, max_bytes: usize) -> Result<Vec<u8>, SerialError> {
        let mut guard = self
            .port
            .lock()
            .map_err(|e| SerialError::read_failed(&self.name, format!("Port mutex poisoned: {}", e)))?;
        let port = guard
            .as_mut()
            .ok_or_else(|| SerialError::read_failed(&self.name, "port is not open"))?;

        let mut buf = vec![0u8; max_bytes];
        let mut filled = 0;
        while filled < max_bytes {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SerialError::read_failed(&self.name, e)),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn write_raw(&self, bytes: &[u8]) -> Result<(), SerialError> {
        let mut guard = self
            .port
            .lock()
            .map_err(|e| SerialError::write_failed(&self.name, format!("Port mutex poisoned: {}", e)))?;
        let port = guard
            .as_mut()
            .ok_or_else(|| SerialError::write_failed(&self.name, "port is not open"))?;

        port.write_all(bytes)
            .and_then(|_| port.flush())
            .map_err(|e| SerialError::write_failed(&self.name, e))
    }

    fn is_open(&self) -> bool {
        self.port.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for NativePort {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            crate::port_log!(self.name, "{}", e);
        }
    }
}

/// Notification loop: report pending byte counts until cancelled, closed, or
/// the driver fails.
fn run_event_loop(
    name: String,
    port: SharedPort,
    cancel_flag: Arc<AtomicBool>,
    handler: RxHandler,
    poll_interval: Duration,
) {
    loop {
        if cancel_flag.load(Ordering::Relaxed) {
            break;
        }

        let pending = match port.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(p) => p.bytes_to_read(),
                None => break,
            },
            Err(e) => {
                crate::port_log!(name, "Mutex poisoned in event loop: {}", e);
                break;
            }
        };

        match pending {
            Ok(n) if n > 0 => handler(n as usize),
            Ok(_) => thread::sleep(poll_interval),
            Err(e) => {
                crate::port_log!(name, "Driver error, notifications stopped: {}", e);
                break;
            }
        }
    }

    crate::port_log!(name, "Notification thread exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::serial::config::{Parity, StopBits};

    fn noop_handler() -> RxHandler {
        Arc::new(|_: usize| {})
    }

    #[test]
    fn test_open_missing_device_fails() {
        let port = NativePort::new("/dev/firmata-serial-does-not-exist");
        let config = SerialConfig::with_port("/dev/firmata-serial-does-not-exist");

        let err = port.open(&config, noop_handler()).unwrap_err();
        assert!(matches!(err, SerialError::OpenFailed { .. }));
        assert!(!port.is_open());
    }

    #[test]
    fn test_unsupported_parameters_are_rejected_before_opening() {
        let port = NativePort::new("COM9");
        let mut config = SerialConfig::with_port("COM9");
        config.parity = Parity::Mark;
        let err = port.open(&config, noop_handler()).unwrap_err();
        assert!(err.to_string().contains("Mark parity"));

        config.parity = Parity::None;
        config.stop_bits = StopBits::OneAndHalf;
        let err = port.open(&config, noop_handler()).unwrap_err();
        assert!(err.to_string().contains("1.5 stop bits"));
    }

    #[test]
    fn test_closed_port_behaviour() {
        let port = NativePort::new("COM9").with_poll_interval(Duration::from_millis(5));
        assert!(port.close().is_ok());
        assert!(port.close().is_ok());
        assert!(matches!(port.write_raw(&[0x01]), Err(SerialError::WriteFailed { .. })));
        assert!(matches!(port.read_raw(4), Err(SerialError::ReadFailed { .. })));
        assert_eq!(port.name(), "COM9");
    }
}

// Exercises the notification thread against a pseudo-terminal pair: the master
// end plays the device, the slave path is opened like any other serial port.
#[cfg(all(test, unix))]
mod pty_tests {
    use super::*;
    use crate::io::serial::{SerialListener, SerialTransport};
    use serialport::TTYPort;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    const DEADLINE: Duration = Duration::from_secs(5);

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let started = Instant::now();
        while started.elapsed() < DEADLINE {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        condition()
    }

    /// Returns the device end, the slave end (kept open so the pty survives
    /// our own closes) and a transport over the slave path.
    fn pty_transport() -> (TTYPort, TTYPort, SerialTransport) {
        let (mut master, slave) = TTYPort::pair().unwrap();
        master.set_timeout(Duration::from_millis(500)).unwrap();
        let path = slave.name().unwrap();
        let transport = SerialTransport::native(SerialConfig::with_port(path));
        (master, slave, transport)
    }

    fn counting_listener(calls: &Arc<AtomicUsize>) -> Arc<dyn SerialListener> {
        let calls = calls.clone();
        Arc::new(move |_: &SerialTransport| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_device_bytes_arrive_in_order_with_one_call_per_byte() {
        let (mut master, _slave, transport) = pty_transport();
        let calls = Arc::new(AtomicUsize::new(0));
        transport.add_listener(counting_listener(&calls));
        transport.start().unwrap();
        assert!(transport.is_open());

        master.write_all(&[0x41, 0x42, 200]).unwrap();

        assert!(wait_for(|| transport.available() == 3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(transport.read(), 65);
        assert_eq!(transport.read(), 66);
        assert_eq!(transport.read(), 200);
        assert_eq!(transport.read(), -1);

        transport.stop().unwrap();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_large_burst_is_drained_completely() {
        let (mut master, _slave, transport) = pty_transport();
        transport.start().unwrap();

        let burst: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        master.write_all(&burst).unwrap();

        assert!(wait_for(|| transport.available() == burst.len()));
        let received: Vec<u8> = std::iter::from_fn(|| transport.read_byte()).collect();
        assert_eq!(received, burst);
        transport.stop().unwrap();
    }

    #[test]
    fn test_writes_reach_the_device() {
        let (mut master, _slave, transport) = pty_transport();
        transport.start().unwrap();

        transport.write(&[0xF0, 0x79, 0xF7]).unwrap();
        transport.write_byte(0xF9).unwrap();

        let mut received = [0u8; 4];
        master.read_exact(&mut received).unwrap();
        assert_eq!(received, [0xF0, 0x79, 0xF7, 0xF9]);
        transport.stop().unwrap();
    }

    #[test]
    fn test_stop_from_listener_then_restart() {
        let (mut master, _slave, transport) = pty_transport();
        let stopper: Arc<dyn SerialListener> = Arc::new(|t: &SerialTransport| {
            let _ = t.stop();
        });
        transport.add_listener(stopper.clone());
        transport.start().unwrap();

        // Stopping on the notification thread must not try to join itself
        master.write_all(&[0x01]).unwrap();
        assert!(wait_for(|| !transport.is_open()));
        assert!(transport.is_stopping());
        assert_eq!(transport.read(), 0x01);

        assert!(transport.remove_listener(&stopper));
        let calls = Arc::new(AtomicUsize::new(0));
        transport.add_listener(counting_listener(&calls));
        transport.clear();
        transport.start().unwrap();
        assert!(!transport.is_stopping());

        master.write_all(&[0x02, 0x03]).unwrap();
        assert!(wait_for(|| transport.available() == 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(transport.read(), 0x02);
        assert_eq!(transport.read(), 0x03);
        transport.stop().unwrap();
    }

    #[test]
    fn test_close_from_caller_joins_notification_thread() {
        let (_master, slave) = TTYPort::pair().unwrap();
        let port = NativePort::new(slave.name().unwrap()).with_poll_interval(Duration::from_millis(5));
        let config = SerialConfig::with_port(port.name());

        port.open(&config, Arc::new(|_: usize| {})).unwrap();
        assert!(matches!(
            port.open(&config, Arc::new(|_: usize| {})),
            Err(SerialError::OpenFailed { .. })
        ));

        port.close().unwrap();
        assert!(!port.is_open());
        assert!(port.event_thread.lock().unwrap().is_none());

        port.open(&config, Arc::new(|_: usize| {})).unwrap();
        assert!(port.is_open());
        port.close().unwrap();
    }
}
