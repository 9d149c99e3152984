//! Waker slot shared with an interrupt handler, guarded by critical sections.
//!
//! Holds at most one waker: the single task waiting on the receive buffer.

use core::{cell::Cell, task::Waker};
use critical_section::Mutex;

/// Stores the waker of the task waiting for received bytes.
pub(crate) struct AtomicWaker {
    waker: Mutex<Cell<Option<Waker>>>,
}

impl AtomicWaker {
    pub(crate) const fn new() -> Self {
        Self {
            waker: Mutex::new(Cell::new(None)),
        }
    }

    /// Registers `new_waker`, replacing any previous one.
    ///
    /// Skips the clone when the stored waker would already wake the same task.
    pub(crate) fn register(&self, new_waker: &Waker) {
        critical_section::with(|cs| {
            let slot = self.waker.borrow(cs);
            let current = slot.take();
            match current {
                Some(w) if w.will_wake(new_waker) => slot.set(Some(w)),
                _ => slot.set(Some(new_waker.clone())),
            }
        });
    }

    /// Wakes and clears the registered waker, if any.
    ///
    /// The waker runs after the critical section ends.
    pub(crate) fn wake(&self) {
        if let Some(w) = critical_section::with(|cs| self.waker.borrow(cs).take()) {
            w.wake();
        }
    }
}
