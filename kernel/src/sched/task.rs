//! Thread control block.
//!
//! The saved-stack-pointer field is deliberately the first member: the
//! assembly trampoline in [`crate::sched::context`] indexes into a `Thread`
//! through a raw pointer and assumes offset zero holds the stack pointer to
//! save/restore across a context switch.

use alloc::boxed::Box;
use core::ptr::NonNull;

use crate::{
    mm::frame::Frame,
    sync::intrusive_list::{Linked, Links},
};

/// Attach mode passed to [`crate::sched::scheduler::spawn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnMode {
    /// Caller intends to `join` this thread; a parent reference is held
    /// until the join happens.
    Attached,
    /// No parent reference; the thread frees itself (via the work queue)
    /// once it exits.
    Detached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Waiting,
    Exited,
    Killed,
}

/// One page, reserved for the thread's kernel stack. Freed by the work
/// queue after the thread's refcount reaches zero (a thread cannot free
/// the stack it is still executing on).
pub struct KernelStack {
    pub frame: NonNull<Frame>,
    pub top: usize,
}

pub struct Thread {
    /// Saved stack pointer. MUST remain the first field (assembly
    /// invariant, see module docs).
    pub saved_sp: usize,

    pub tid: u64,
    pub tick_count: u32,
    pub stack: KernelStack,
    pub parent: Option<NonNull<Thread>>,
    pub state: ThreadState,
    pub exit_code: i32,
    /// Self-reference plus one per outstanding observer (an `Attached`
    /// parent). Dropped to zero schedules destruction on the work queue.
    pub refcount: u32,
    /// Threads parked in `join()` waiting for this thread to finish.
    pub join_waiters: super::wait_queue::WaitQueue,

    links: Links<Thread>,
}

// SAFETY: `Thread` is only ever mutated while the owning list's lock (an
// interrupt-atomic region for the run/wait queues) is held, matching the
// concurrency model documented in sync::intrusive_list.
unsafe impl Send for Thread {}

unsafe impl Linked for Thread {
    fn links(&self) -> &Links<Self> {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Links<Self> {
        &mut self.links
    }
}

impl Thread {
    pub(super) fn new(tid: u64, stack: KernelStack, parent: Option<NonNull<Thread>>) -> Box<Self> {
        Box::new(Self {
            saved_sp: 0,
            tid,
            tick_count: 0,
            stack,
            parent,
            state: ThreadState::Ready,
            exit_code: 0,
            refcount: if parent.is_some() { 2 } else { 1 },
            join_waiters: super::wait_queue::WaitQueue::new(),
            links: Links::new(),
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, ThreadState::Exited | ThreadState::Killed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn detached_thread_starts_with_refcount_one() {
        // A detached thread has only its own self-reference; no parent to
        // observe exit, so refcount starts at 1 and join() is never valid.
        let stack = KernelStack {
            frame: NonNull::dangling(),
            top: 0,
        };
        let t = Thread::new(1, stack, None);
        assert_eq!(t.refcount, 1);
        assert_eq!(t.state, ThreadState::Ready);
    }

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn attached_thread_starts_with_refcount_two() {
        let stack = KernelStack {
            frame: NonNull::dangling(),
            top: 0,
        };
        let mut parent = Thread::new(0, KernelStack { frame: NonNull::dangling(), top: 0 }, None);
        let parent_ptr = NonNull::from(parent.as_mut());
        let t = Thread::new(2, stack, Some(parent_ptr));
        assert_eq!(t.refcount, 2);
    }
}
