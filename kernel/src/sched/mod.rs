//! Thread scheduler.
//!
//! [`task`] defines the thread control block, [`wait_queue`] the FIFO list
//! blocking calls park on, [`scheduler`] the run queue and context switch,
//! and [`workqueue`] the deferred-callback mechanism used to free resources
//! a thread cannot free for itself.

pub mod scheduler;
pub mod task;
pub mod wait_queue;
pub mod workqueue;

pub use scheduler::{current, exit, join, spawn, tick, yield_now};
pub use task::SpawnMode;

/// Bring up the scheduler and its work queue worker. Call once during boot,
/// after the frame allocator is initialized.
pub fn init() {
    scheduler::init();
    workqueue::init();
}
