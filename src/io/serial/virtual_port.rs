// src/io/serial/virtual_port.rs
//
// In-memory PortHandle. The "hardware" side is driven by the caller:
// inject() plays the role of bytes arriving on the wire, written() shows what
// the transport transmitted, and fail_next_*() arm one-shot driver errors.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use super::config::SerialConfig;
use super::error::SerialError;
use super::port::{PortHandle, RxHandler};

#[derive(Default)]
struct VirtualState {
    open: bool,
    handler: Option<RxHandler>,
    /// Driver-level receive buffer
    rx: VecDeque<u8>,
    written: Vec<u8>,
    last_config: Option<SerialConfig>,
    open_count: usize,
    fail_open: Option<String>,
    fail_close: Option<String>,
    fail_read: Option<String>,
    fail_write: Option<String>,
}

pub struct VirtualPort {
    name: String,
    state: Mutex<VirtualState>,
}

impl VirtualPort {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(VirtualState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, VirtualState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Simulate bytes arriving on the line. Delivers one notification for the
    /// whole batch on the calling thread. Bytes arriving while the port is
    /// closed are lost, as on a real line; returns false in that case.
    pub fn inject(&self, bytes: &[u8]) -> bool {
        let handler = {
            let mut state = self.state();
            if !state.open {
                return false;
            }
            state.rx.extend(bytes.iter().copied());
            state.handler.clone()
        };

        if let Some(handler) = handler {
            if !bytes.is_empty() {
                handler(bytes.len());
            }
        }
        true
    }

    /// Bytes received by the driver but not yet drained by read_raw
    pub fn pending(&self) -> usize {
        self.state().rx.len()
    }

    /// Everything transmitted so far
    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.state().written)
    }

    /// Parameters passed to the most recent successful open
    pub fn last_config(&self) -> Option<SerialConfig> {
        self.state().last_config.clone()
    }

    pub fn open_count(&self) -> usize {
        self.state().open_count
    }

    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.state().fail_open = Some(message.into());
    }

    /// The port stays open when the armed close failure fires
    pub fn fail_next_close(&self, message: impl Into<String>) {
        self.state().fail_close = Some(message.into());
    }

    /// The armed read failure discards the bytes it was asked for, like a
    /// line error would
    pub fn fail_next_read(&self, message: impl Into<String>) {
        self.state().fail_read = Some(message.into());
    }

    pub fn fail_next_write(&self, message: impl Into<String>) {
        self.state().fail_write = Some(message.into());
    }
}

impl PortHandle for VirtualPort {
    fn open(&self, config: &SerialConfig, handler: RxHandler) -> Result<(), SerialError> {
        let mut state = self.state();
        if state.open {
            return Err(SerialError::open_failed(&config.port, "port is already open"));
        }
        if let Some(message) = state.fail_open.take() {
            return Err(SerialError::open_failed(&config.port, message));
        }

        state.open = true;
        state.handler = Some(handler);
        state.last_config = Some(config.clone());
        state.open_count += 1;
        Ok(())
    }

    fn close(&self) -> Result<(), SerialError> {
        let mut state = self.state();
        if let Some(message) = state.fail_close.take() {
            return Err(SerialError::close_failed(&self.name, message));
        }
        state.open = false;
        state.handler = None;
        state.rx.clear();
        Ok(())
    }

    fn read_raw(&self, max_bytes: usize) -> Result<Vec<u8>, SerialError> {
        let mut state = self.state();
        if !state.open {
            return Err(SerialError::read_failed(&self.name, "port is not open"));
        }

        let count = max_bytes.min(state.rx.len());
        let bytes: Vec<u8> = state.rx.drain(..count).collect();
        match state.fail_read.take() {
            Some(message) => Err(SerialError::read_failed(&self.name, message)),
            None => Ok(bytes),
        }
    }

    fn write_raw(&self, bytes: &[u8]) -> Result<(), SerialError> {
        let mut state = self.state();
        if !state.open {
            return Err(SerialError::write_failed(&self.name, "port is not open"));
        }
        if let Some(message) = state.fail_write.take() {
            return Err(SerialError::write_failed(&self.name, message));
        }
        state.written.extend_from_slice(bytes);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inject_notifies_with_batch_size() {
        let port = VirtualPort::new("virtual0");
        let seen = Arc::new(AtomicUsize::new(0));
        let handler: RxHandler = {
            let seen = seen.clone();
            Arc::new(move |n: usize| {
                seen.fetch_add(n, Ordering::SeqCst);
            })
        };

        assert!(!port.inject(&[1, 2, 3]));
        port.open(&SerialConfig::default(), handler).unwrap();
        assert!(port.inject(&[1, 2, 3]));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(port.pending(), 3);
        assert_eq!(port.read_raw(2).unwrap(), vec![1, 2]);
        assert_eq!(port.read_raw(10).unwrap(), vec![3]);
    }

    #[test]
    fn test_double_open_is_rejected() {
        let port = VirtualPort::new("virtual0");
        port.open(&SerialConfig::default(), Arc::new(|_: usize| {})).unwrap();
        let err = port.open(&SerialConfig::default(), Arc::new(|_: usize| {})).unwrap_err();
        assert!(matches!(err, SerialError::OpenFailed { .. }));
        assert_eq!(port.open_count(), 1);
    }

    #[test]
    fn test_armed_failures_fire_once() {
        let port = VirtualPort::new("virtual0");
        port.fail_next_open("device busy");
        assert!(port.open(&SerialConfig::default(), Arc::new(|_: usize| {})).is_err());
        port.open(&SerialConfig::default(), Arc::new(|_: usize| {})).unwrap();

        port.fail_next_write("cable unplugged");
        assert!(port.write_raw(&[0xAA]).is_err());
        port.write_raw(&[0xBB]).unwrap();
        assert_eq!(port.take_written(), vec![0xBB]);
        assert!(port.written().is_empty());

        port.fail_next_close("stuck");
        assert!(port.close().is_err());
        assert!(port.is_open());
        assert!(port.close().is_ok());
        assert!(!port.is_open());
    }
}
