//! A queue of threads blocked on some condition.
//!
//! Thin wrapper over [`IntrusiveList`] plus the two scheduler primitives
//! every blocking call is built from: [`WaitQueue::park_current`] (enqueue
//! the running thread and switch away) and `wakeup_one`/`wakeup_all` (move
//! threads back onto the run queue). Callers are expected to hold an
//! interrupt-atomic region for the whole enqueue-then-switch sequence, the
//! same discipline the source kernel's `Wait()` uses to avoid a missed
//! wakeup between a condition check and parking.

use core::ptr::NonNull;

use crate::sched::task::Thread;
use crate::sync::intrusive_list::IntrusiveList;

pub struct WaitQueue {
    threads: IntrusiveList<Thread>,
}

impl WaitQueue {
    pub const fn new() -> Self {
        Self {
            threads: IntrusiveList::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Enqueue `thread` (the currently running thread) onto this queue.
    /// Does not itself switch away; pair with a scheduler yield.
    pub(super) fn enqueue(&mut self, thread: NonNull<Thread>) {
        self.threads.append(thread);
    }

    /// Move the longest-waiting thread back onto the run queue, if any.
    pub fn wakeup_one(&mut self) {
        if let Some(thread) = self.threads.first() {
            self.threads.remove(thread);
            super::scheduler::make_ready(thread);
        }
    }

    /// Move every waiting thread back onto the run queue.
    pub fn wakeup_all(&mut self) {
        while let Some(thread) = self.threads.first() {
            self.threads.remove(thread);
            super::scheduler::make_ready(thread);
        }
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}
