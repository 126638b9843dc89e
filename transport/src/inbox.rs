//! Single-producer, single-consumer inboxes used to hand frames from the
//! receive loop to the other two session activities without either of them
//! ever touching the socket themselves.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// One end of a channel the receive loop pushes frame-arrival notifications
/// into, and some other activity drains.
pub struct Inbox<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> Inbox<T> {
    /// Creates a fresh, empty inbox.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// Returns a cloneable sender for the producer side (the receive loop).
    pub fn sender(&self) -> Sender<T> {
        self.tx.clone()
    }

    /// Blocks up to `timeout` waiting for one item.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drains whatever is already queued without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self::new()
    }
}
