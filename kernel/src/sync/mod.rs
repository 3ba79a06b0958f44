//! Synchronization primitives.
//!
//! [`atomic`] is the lowest layer (interrupt-atomic regions); everything
//! else composes on top of it. [`mutex`] and [`intrusive_list`] are the
//! sleep-based lock/condvar and the shared list type backing run queues,
//! wait queues, and the frame free list.

pub mod atomic;
pub mod intrusive_list;
pub mod mutex;

pub use mutex::{Condvar, Mutex, MutexGuard};
