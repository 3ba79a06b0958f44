//! Single-consumer deferred work queue.
//!
//! Interrupt handlers and other contexts that cannot block schedule a
//! `(callback, data)` pair here instead of doing the work inline; one
//! dedicated worker thread drains the queue and runs callbacks with
//! interrupts enabled. Used today to free a thread's kernel stack only
//! after the thread itself has exited (it cannot free the stack it is
//! still running on).

use alloc::collections::VecDeque;

use crate::sched::task::SpawnMode;
use crate::sync::mutex::{Condvar, Mutex};

type Callback = extern "C" fn(usize);

struct WorkItem {
    callback: Callback,
    data: usize,
}

static QUEUE: Mutex<VecDeque<WorkItem>> = Mutex::new(VecDeque::new());
static QUEUE_NONEMPTY: Condvar = Condvar::new();

/// Queue `callback(data)` to run on the work queue's worker thread.
pub fn schedule_work(callback: Callback, data: usize) {
    QUEUE.lock().push_back(WorkItem { callback, data });
    QUEUE_NONEMPTY.notify_one();
}

extern "C" fn worker_main() -> ! {
    loop {
        let item = {
            let mut guard = QUEUE.lock();
            loop {
                if let Some(item) = guard.pop_front() {
                    break item;
                }
                guard = QUEUE_NONEMPTY.wait(guard);
            }
        };
        (item.callback)(item.data);
    }
}

/// Spawn the work queue's worker thread. Call once during scheduler bring-up.
pub fn init() {
    super::scheduler::spawn(worker_main, SpawnMode::Detached);
}
