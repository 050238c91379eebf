// src/io/serial/listeners.rs
//
// Observers notified once per received byte.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use super::transport::SerialTransport;

/// Callback invoked on the notification thread after each received byte has
/// been appended to the reception buffer. Keep it short: a slow listener
/// delays every byte behind it.
pub trait SerialListener: Send + Sync {
    fn on_data_received(&self, transport: &SerialTransport);
}

impl<F> SerialListener for F
where
    F: Fn(&SerialTransport) + Send + Sync,
{
    fn on_data_received(&self, transport: &SerialTransport) {
        self(transport)
    }
}

/// Identity comparison on the data pointer only; vtable pointers for the same
/// object may differ between codegen units.
fn same_listener(a: &Arc<dyn SerialListener>, b: &Arc<dyn SerialListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Registration-ordered listener list.
///
/// Notification works on a snapshot and never holds the lock while a
/// listener runs, so listeners may add or remove listeners (themselves
/// included) from inside their callback.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<Arc<dyn SerialListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Arc<dyn SerialListener>>> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn add(&self, listener: Arc<dyn SerialListener>) {
        self.guard().push(listener);
    }

    /// Remove the first registration of this exact listener.
    /// Returns false if it was not registered.
    pub fn remove(&self, listener: &Arc<dyn SerialListener>) -> bool {
        let mut guard = self.guard();
        match guard.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                guard.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    pub fn notify_all(&self, transport: &SerialTransport) {
        let snapshot: Vec<Arc<dyn SerialListener>> = self.guard().clone();
        for listener in snapshot {
            listener.on_data_received(transport);
        }
    }
}

// ============================================================================
// Channel Listener
// ============================================================================

/// Message sent by a ChannelListener for every received byte
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataReceived {
    /// Bytes buffered at the moment of notification
    pub available: usize,
}

/// Listener that forwards notifications over an unbounded channel, moving
/// heavier processing off the notification thread. Sending never blocks.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<DataReceived>,
}

impl ChannelListener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<DataReceived>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl SerialListener for ChannelListener {
    fn on_data_received(&self, transport: &SerialTransport) {
        // Receiver gone means nobody is interested any more
        let _ = self.tx.send(DataReceived {
            available: transport.available(),
        });
    }
}
