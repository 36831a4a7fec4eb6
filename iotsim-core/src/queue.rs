//! ## iotsim-core::queue
//! **Unbounded reading channel built on `crossbeam::channel`**
//!
//! Carries readings from every device simulator to the live observer.
//!
//! - `put` never blocks and never fails
//! - `get` blocks until an item is available
//! - Items from one producer keep that producer's order; interleaving across
//!   producers is whatever the scheduler produced
//! - No capacity limit, no backpressure, no replay

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::reading::Reading;

/// Thread-safe FIFO shared between simulators and the consumer.
///
/// Every handle owns both ends of the channel, so the channel can never be
/// observed as disconnected through a handle.
pub struct ReadingQueue {
    tx: Sender<Reading>,
    rx: Receiver<Reading>,
}

impl ReadingQueue {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    /// Creates a new handle to the same underlying channel.
    #[inline]
    pub fn share(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }

    /// Enqueues a reading.
    #[inline]
    pub fn put(&self, reading: Reading) {
        // Unbounded and never disconnected: `send` cannot fail here.
        let _ = self.tx.send(reading);
    }

    /// Removes the oldest reading, blocking until one is available.
    pub fn get(&self) -> Reading {
        match self.rx.recv() {
            Ok(reading) => reading,
            Err(_) => unreachable!("queue handle keeps its own sender alive"),
        }
    }

    /// Removes the oldest reading if one is immediately available.
    #[inline]
    pub fn try_get(&self) -> Option<Reading> {
        self.rx.try_recv().ok()
    }

    /// Like [`get`](Self::get) but gives up after `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Option<Reading> {
        match self.rx.recv_timeout(timeout) {
            Ok(reading) => Some(reading),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for ReadingQueue {
    fn default() -> Self {
        Self::new()
    }
}
