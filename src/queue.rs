//! Bounded "latest wins" queues connecting the pipeline stages.
//!
//! A full queue never blocks or rejects its producer: the oldest entry is
//! evicted and the new one inserted. Consumers block for at most a timeout so
//! they can re-check the running flag between items.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::time::Duration;

/// Result of a [`LatestQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Inserted without evicting anything
    Inserted,
    /// The oldest entry was dropped to make room
    EvictedOldest,
}

/// Bounded FIFO that prefers freshness over completeness.
///
/// Cloning produces another handle to the same queue.
pub struct LatestQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> Clone for LatestQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> std::fmt::Debug for LatestQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LatestQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T> LatestQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity }
    }

    /// Insert `item`, evicting the oldest entry if the queue is full.
    pub fn push(&self, item: T) -> PushOutcome {
        let mut item = item;
        let mut evicted = false;

        loop {
            match self.tx.try_send(item) {
                Ok(()) => {
                    return if evicted {
                        PushOutcome::EvictedOldest
                    } else {
                        PushOutcome::Inserted
                    };
                }
                Err(TrySendError::Full(back)) => {
                    // A consumer may have drained the head in between; retrying is enough.
                    if self.rx.try_recv().is_ok() {
                        evicted = true;
                    }
                    item = back;
                }
                // Both ends live in `self`, so the channel cannot disconnect.
                Err(TrySendError::Disconnected(_)) => return PushOutcome::Inserted,
            }
        }
    }

    /// Wait up to `timeout` for the oldest item.
    ///
    /// Returns `None` on timeout so the caller can re-check its running flag.
    pub fn pop(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Take the oldest item without waiting.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
