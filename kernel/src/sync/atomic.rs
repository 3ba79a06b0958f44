//! Interrupt-atomic regions.
//!
//! The kernel's lowest-level mutual exclusion primitive: a span with
//! hardware interrupts disabled. Every mutation of a wait queue, run queue,
//! frame free list, or block-request state happens inside one of these.
//!
//! Nesting is permitted only through the save/restore discipline below;
//! raw `sti`/`cli` outside this module is a bug. [`begin_atomic`] returns
//! the interrupt-enable flag that was in effect *before* the call, and the
//! matching [`end_atomic`] restores exactly that flag, so nested atomic
//! regions compose correctly even though interrupts are a single global
//! flag rather than a counter.

use x86_64::instructions::interrupts;

/// Disable interrupts and return whether they were enabled beforehand.
///
/// Pairs with [`end_atomic`]. Prefer [`atomic`] / [`AtomicGuard`] unless you
/// need the flag to cross a function boundary (e.g. `park`, which disables
/// on entry and must restore on a different code path than where it began).
#[inline]
pub fn begin_atomic() -> bool {
    let was_enabled = interrupts::are_enabled();
    interrupts::disable();
    was_enabled
}

/// Restore the interrupt-enable state captured by [`begin_atomic`].
#[inline]
pub fn end_atomic(was_enabled: bool) {
    if was_enabled {
        interrupts::enable();
    }
}

/// Scoped RAII guard over an atomic region, so every exit path (including
/// early `return` and `?`) restores interrupts correctly.
#[must_use = "dropping this immediately ends the atomic region"]
pub struct AtomicGuard {
    was_enabled: bool,
}

impl AtomicGuard {
    #[inline]
    pub fn enter() -> Self {
        Self {
            was_enabled: begin_atomic(),
        }
    }
}

impl Drop for AtomicGuard {
    #[inline]
    fn drop(&mut self) {
        end_atomic(self.was_enabled);
    }
}

/// Run `f` inside an interrupt-atomic region.
#[inline]
pub fn atomic<R>(f: impl FnOnce() -> R) -> R {
    let _guard = AtomicGuard::enter();
    f()
}

/// True if interrupts are currently enabled. Used by primitives that must
/// assert they are being called from an interruptible context (mutex lock,
/// `wait`/`park` entry points).
#[inline]
pub fn interrupts_enabled() -> bool {
    interrupts::are_enabled()
}
