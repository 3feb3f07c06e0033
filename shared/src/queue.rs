//! FIFO handoff from the receive thread to the tick
//!
//! The receive thread only ever pushes. The tick drains everything queued so
//! far in one go and applies it outside the lock, so neither side holds the
//! mutex while doing real work. There is no capacity limit: a slow tick simply
//! finds a longer queue on its next drain.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct InboundQueue<T> {
    items: Arc<Mutex<VecDeque<T>>>,
}

impl<T> InboundQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Appends an event; called from the receive thread
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
    }

    /// Takes every queued event in arrival order
    pub fn drain(&self) -> VecDeque<T> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave the deque half-updated, so a
    // poisoned mutex is still safe to use.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Clone for InboundQueue<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for InboundQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
