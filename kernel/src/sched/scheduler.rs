//! FIFO thread scheduler.
//!
//! One run queue, FCFS within it, cooperative by default. The timer tick
//! adds advisory preemption: a thread's quantum expiring requests a
//! reschedule, but the request is only acted on once `preemption_enabled()`
//! is true, so a short span that must not be interrupted (the run-queue
//! manipulation inside [`wait`]/[`make_ready`] itself, or a caller that
//! explicitly raised the guard) can defer it instead of racing the
//! scheduler against itself.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use alloc::boxed::Box;

use crate::arch::x86_64::context::{new_thread_stack, switch_to};
use crate::mm::frame::{self, FrameState};
use crate::sched::task::{KernelStack, SpawnMode, Thread, ThreadState};
use crate::sched::wait_queue::WaitQueue;
use crate::sync::atomic::atomic;
use crate::sync::intrusive_list::IntrusiveList;

const QUANTUM_TICKS: u32 = 10;
const KERNEL_STACK_PAGES: usize = 1;

struct Scheduler {
    run_queue: IntrusiveList<Thread>,
    current: Option<NonNull<Thread>>,
    next_tid: u64,
    idle: Option<NonNull<Thread>>,
}

impl Scheduler {
    const fn new() -> Self {
        Self {
            run_queue: IntrusiveList::new(),
            current: None,
            next_tid: 1,
            idle: None,
        }
    }
}

// All access to `SCHED` happens inside `atomic()`, so a plain Cell over an
// interior `Scheduler` is sufficient on this single-CPU kernel.
struct SchedCell(core::cell::UnsafeCell<Scheduler>);
unsafe impl Sync for SchedCell {}

static SCHED: SchedCell = SchedCell(core::cell::UnsafeCell::new(Scheduler::new()));
static PREEMPT_DISABLE_COUNT: AtomicU32 = AtomicU32::new(0);
static RESCHED_NEEDED: AtomicBool = AtomicBool::new(false);

#[allow(clippy::mut_from_ref)]
fn sched() -> &'static mut Scheduler {
    // SAFETY: every caller in this module holds an interrupt-atomic region
    // (single CPU, so that is sufficient exclusion).
    unsafe { &mut *SCHED.0.get() }
}

/// True when a reschedule may safely happen right now.
pub fn preemption_enabled() -> bool {
    atomic(|| PREEMPT_DISABLE_COUNT.load(Ordering::Relaxed) == 0)
}

/// Raise the preemption-disable count. Pairs with [`enable_preemption`].
pub fn disable_preemption() {
    atomic(|| PREEMPT_DISABLE_COUNT.fetch_add(1, Ordering::Relaxed));
}

/// Lower the preemption-disable count; if it reaches zero and a tick
/// deferred a reschedule in the meantime, take it now.
pub fn enable_preemption() {
    let should_yield = atomic(|| {
        let count = PREEMPT_DISABLE_COUNT.load(Ordering::Relaxed) - 1;
        PREEMPT_DISABLE_COUNT.store(count, Ordering::Relaxed);
        if count == 0 && RESCHED_NEEDED.load(Ordering::Relaxed) {
            RESCHED_NEEDED.store(false, Ordering::Relaxed);
            true
        } else {
            false
        }
    });
    if should_yield {
        yield_now();
    }
}

extern "C" fn idle_trampoline() -> ! {
    loop {
        crate::arch::idle();
    }
}

/// Bring up the scheduler: create the idle thread and adopt the calling
/// (boot) context as the first "current" thread.
pub fn init() {
    atomic(|| {
        let boot = Thread::new(0, alloc_stack(), None);
        sched().current = Some(NonNull::from(Box::leak(boot)));

        let idle_stack = alloc_stack();
        let sp = new_thread_stack(idle_stack.top, idle_trampoline);
        let mut idle = Thread::new(u64::MAX, idle_stack, None);
        idle.saved_sp = sp;
        sched().idle = Some(NonNull::from(Box::leak(idle)));
    });
}

fn alloc_stack() -> KernelStack {
    let frame = frame::alloc(FrameState::KStack);
    let base = unsafe { frame.as_ref() }.phys_addr();
    KernelStack {
        frame,
        top: base + KERNEL_STACK_PAGES * frame::FRAME_SIZE,
    }
}

/// Spawn a new thread running `entry`. Returns a handle to the new thread;
/// `Attached` callers pass it to [`join`], `Detached` callers may discard it.
pub fn spawn(entry: extern "C" fn() -> !, mode: SpawnMode) -> NonNull<Thread> {
    atomic(|| {
        let s = sched();
        let tid = s.next_tid;
        s.next_tid += 1;

        let parent = if mode == SpawnMode::Attached {
            s.current
        } else {
            None
        };
        let stack = alloc_stack();
        let sp = new_thread_stack(stack.top, entry);
        let mut thread = Thread::new(tid, stack, parent);
        thread.saved_sp = sp;
        let ptr = NonNull::from(Box::leak(thread));
        s.run_queue.append(ptr);
        ptr
    })
}

/// The currently running thread.
pub fn current() -> NonNull<Thread> {
    atomic(|| sched().current.expect("scheduler not initialized"))
}

/// Like [`current`], but `None` instead of panicking when there is no
/// running thread (the scheduler hasn't been brought up yet, as in a
/// host-side unit test that exercises a primitive without booting).
pub fn try_current() -> Option<NonNull<Thread>> {
    atomic(|| sched().current)
}

/// Move `thread` from wherever it is onto the back of the run queue,
/// marking it `Ready`. Called by [`crate::sched::wait_queue::WaitQueue`]
/// when waking a waiter, and by the timer tick for the preempted thread.
pub(super) fn make_ready(mut thread: NonNull<Thread>) {
    // SAFETY: caller holds the atomic region that protects thread state.
    let t = unsafe { thread.as_mut() };
    t.state = ThreadState::Ready;
    sched().run_queue.append(thread);
}

/// Pick the next thread to run (idle if nothing is ready) and switch to it.
/// Must be called with interrupts disabled; returns after this thread is
/// resumed.
fn schedule() {
    let (prev, next) = {
        let s = sched();
        let prev = s.current.expect("schedule() with no current thread");
        let next = s
            .run_queue
            .first()
            .map(|n| {
                s.run_queue.remove(n);
                n
            })
            .or(s.idle);
        (prev, next.expect("no idle thread to fall back to"))
    };
    if prev == next {
        return;
    }
    sched().current = Some(next);
    unsafe {
        (*next.as_ptr()).state = ThreadState::Running;
        let prev_sp_ptr = &mut (*prev.as_ptr()).saved_sp as *mut usize;
        let next_sp = (*next.as_ptr()).saved_sp;
        switch_to(prev_sp_ptr, next_sp);
    }
}

/// Voluntarily give up the CPU; the calling thread stays `Ready` and
/// re-enters the run queue immediately.
pub fn yield_now() {
    atomic(|| {
        let cur = sched().current.expect("yield_now with no current thread");
        if Some(cur) != sched().idle {
            make_ready(cur);
        }
        schedule();
    });
}

/// Park the calling thread on `queue` and switch away. Caller must already
/// hold the atomic region covering both the condition check and this call,
/// so a wakeup cannot be missed between them.
pub(crate) fn wait(queue: &mut WaitQueue) {
    let cur = sched().current.expect("wait with no current thread");
    unsafe { (*cur.as_ptr()).state = ThreadState::Waiting };
    queue.enqueue(cur);
    schedule();
}

/// Called from the timer IRQ handler (interrupts already off via the
/// hardware interrupt gate).
pub fn tick() {
    let s = sched();
    let Some(mut cur) = s.current else { return };
    if Some(cur) == s.idle {
        return;
    }
    let t = unsafe { cur.as_mut() };
    t.tick_count += 1;
    if t.tick_count < QUANTUM_TICKS {
        return;
    }
    t.tick_count = 0;
    if preemption_enabled() {
        make_ready(cur);
        schedule();
    } else {
        RESCHED_NEEDED.store(true, Ordering::Relaxed);
    }
}

/// Terminate the calling thread with `code`, waking any joiners.
pub fn exit(code: i32) -> ! {
    atomic(|| {
        let mut cur = sched().current.expect("exit with no current thread");
        let t = unsafe { cur.as_mut() };
        t.exit_code = code;
        t.state = ThreadState::Exited;
        t.refcount -= 1;
        t.join_waiters.wakeup_all();
        if t.refcount == 0 {
            crate::sched::workqueue::schedule_work(reap_thread, cur.as_ptr() as usize);
        }
        schedule();
    });
    unreachable!("exited thread resumed");
}

extern "C" fn reap_thread(arg: usize) {
    // SAFETY: the work item runs after the thread's refcount dropped to
    // zero, so no other holder of this pointer remains.
    unsafe {
        let ptr = arg as *mut Thread;
        let thread = Box::from_raw(ptr);
        let mut frame = thread.stack.frame;
        frame.as_mut().refcount = 0;
        drop(thread);
        frame::free(frame);
    }
}

/// Block until `tid`'s thread exits, returning its exit code. Only valid
/// for threads spawned `Attached`.
pub fn join(mut thread: NonNull<Thread>) -> i32 {
    loop {
        let done = atomic(|| {
            let t = unsafe { thread.as_mut() };
            if t.is_terminal() {
                Some(t.exit_code)
            } else {
                wait(&mut t.join_waiters);
                None
            }
        });
        if let Some(code) = done {
            atomic(|| {
                let t = unsafe { thread.as_mut() };
                t.refcount -= 1;
                if t.refcount == 0 {
                    crate::sched::workqueue::schedule_work(reap_thread, thread.as_ptr() as usize);
                }
            });
            return code;
        }
    }
}
