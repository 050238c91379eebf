// src/io/serial/buffer.rs
//
// Reception buffer: FIFO of received bytes not yet consumed by the caller.
// Filled by the notification thread, drained by read()/clear() on any thread.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct ReceptionBuffer {
    bytes: Mutex<VecDeque<u8>>,
}

impl ReceptionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic elsewhere cannot leave a VecDeque<u8> half-updated, so a
    // poisoned lock is still safe to use.
    fn guard(&self) -> MutexGuard<'_, VecDeque<u8>> {
        match self.bytes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn push(&self, byte: u8) {
        self.guard().push_back(byte);
    }

    /// Remove and return the oldest byte
    pub fn pop_front(&self) -> Option<u8> {
        self.guard().pop_front()
    }

    /// Drop every buffered byte, returning how many were discarded
    pub fn clear(&self) -> usize {
        let mut guard = self.guard();
        let discarded = guard.len();
        guard.clear();
        discarded
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}
