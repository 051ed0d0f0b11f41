//! Debug-only detection of capability callbacks re-entering a container.
//!
//! Containers call into caller code (equal, digest, render, predicates)
//! while walking a chain. Each walk runs inside a [`Scan`] opened with the
//! name of the operation doing the walking. If a callback calls back into
//! the same container before the scan closes, the second `open` panics and
//! names both operations, e.g. `search` re-entered during `search`.
//!
//! Release builds keep no state; `open` and `Scan` are zero-sized no-ops.

use core::marker::PhantomData;
use std::rc::Rc;

#[cfg(debug_assertions)]
use core::cell::Cell;

/// Per-container record of the operation currently running callbacks.
#[derive(Debug, Default)]
pub struct CallbackGuard {
    #[cfg(debug_assertions)]
    running: Cell<Option<&'static str>>,
    // Shares the Rc'd ops of its container, so stays on one thread.
    _local: PhantomData<Rc<()>>,
}

impl CallbackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `op` as running callbacks until the returned [`Scan`] drops.
    ///
    /// Debug builds panic if another operation on the same container has
    /// a scan open.
    #[inline]
    pub fn open(&self, op: &'static str) -> Scan<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(running) = self.running() {
                panic!(
                    "capability callback re-entered its container: `{}` called during `{}`",
                    op, running
                );
            }
            self.running.set(Some(op));
            Scan { guard: self }
        }

        #[cfg(not(debug_assertions))]
        {
            let _ = op;
            Scan { _guard: PhantomData }
        }
    }

    /// Operation whose scan is open, if any. Always `None` in release builds.
    pub fn running(&self) -> Option<&'static str> {
        #[cfg(debug_assertions)]
        {
            self.running.get()
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    }
}

/// An open scan; closing it lets the container be entered again.
pub struct Scan<'a> {
    #[cfg(debug_assertions)]
    guard: &'a CallbackGuard,
    #[cfg(not(debug_assertions))]
    _guard: PhantomData<&'a CallbackGuard>,
}

#[cfg(debug_assertions)]
impl Drop for Scan<'_> {
    fn drop(&mut self) {
        self.guard.running.set(None);
    }
}
