//! Movement hand-off between the classifier thread and the render loop
//!
//! A bounded channel where the producer never blocks: when the channel is
//! full the oldest pending movement is evicted so the newest decision always
//! gets through. Both ends are non-blocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use mindmaze_core::Direction;

/// Default number of pending movements
pub const DEFAULT_CAPACITY: usize = 8;

/// Bounded, drop-oldest movement queue. Clones share the same channel.
#[derive(Clone, Debug)]
pub struct MovementQueue {
    tx: Sender<Direction>,
    rx: Receiver<Direction>,
    capacity: usize,
    dropped: Arc<AtomicU64>,
}

impl MovementQueue {
    /// Create a queue holding at most `capacity` movements (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self { tx, rx, capacity, dropped: Arc::new(AtomicU64::new(0)) }
    }

    /// Enqueue a movement without blocking.
    ///
    /// Returns the evicted movement when the queue was full.
    pub fn push(&self, direction: Direction) -> Option<Direction> {
        let mut evicted = None;
        let mut pending = direction;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return evicted,
                Err(TrySendError::Full(d)) => {
                    pending = d;
                    // The consumer may have emptied the slot in between
                    if let Ok(old) = self.rx.try_recv() {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        evicted = Some(old);
                    }
                }
                // Unreachable while `self` holds a receiver
                Err(TrySendError::Disconnected(_)) => return evicted,
            }
        }
    }

    /// Take the oldest pending movement, if any, without blocking
    #[must_use]
    pub fn try_pop(&self) -> Option<Direction> {
        self.rx.try_recv().ok()
    }

    /// Discard everything pending
    pub fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }

    /// Movements currently pending
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// True when nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum pending movements
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Movements evicted because the consumer fell behind
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for MovementQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
