//! Sleep-based mutex and condition variable.
//!
//! Unlike a spinlock, a thread that cannot acquire this mutex parks on a
//! wait queue instead of spinning, so it is safe to hold across arbitrarily
//! long critical sections (allocation, I/O waits). Acquisition, release,
//! and the condvar's atomic release-then-park sequence all run inside an
//! interrupt-atomic region, which on this single-CPU kernel is sufficient
//! exclusion on its own -- the region prevents the timer tick (and any
//! other interrupt source) from running a concurrent scheduling decision
//! while the lock's internal state is being read and written. The lock
//! tracks its owner; re-locking from the owning thread or unlocking from a
//! thread that isn't the owner is a fatal assertion, not a silent hang.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::ptr::NonNull;

use crate::sched::scheduler;
use crate::sched::task::Thread;
use crate::sched::wait_queue::WaitQueue;
use crate::sync::atomic::atomic;

pub struct Mutex<T> {
    locked: UnsafeCell<bool>,
    /// The thread currently holding the lock, `None` when unlocked. Used to
    /// reject recursive re-locking and to check that only the owner unlocks.
    owner: UnsafeCell<Option<NonNull<Thread>>>,
    waiters: UnsafeCell<WaitQueue>,
    data: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for Mutex<T> {}
unsafe impl<T: Send> Sync for Mutex<T> {}

impl<T> Mutex<T> {
    pub const fn new(value: T) -> Self {
        Self {
            locked: UnsafeCell::new(false),
            owner: UnsafeCell::new(None),
            waiters: UnsafeCell::new(WaitQueue::new()),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the mutex, parking the calling thread if it is held.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        atomic(|| {
            // SAFETY: reads/writes happen only inside this atomic region.
            if let (Some(holder), Some(me)) = (unsafe { *self.owner.get() }, scheduler::try_current()) {
                crate::kernel_assert!(holder != me, "mutex locked recursively by its own owner");
            }
            while unsafe { *self.locked.get() } {
                scheduler::wait(unsafe { &mut *self.waiters.get() });
            }
            unsafe {
                *self.locked.get() = true;
                *self.owner.get() = scheduler::try_current();
            }
        });
        MutexGuard { mutex: self }
    }

    /// Non-blocking acquire; `None` if currently held.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        let acquired = atomic(|| {
            // SAFETY: see `lock`.
            if unsafe { *self.locked.get() } {
                false
            } else {
                unsafe {
                    *self.locked.get() = true;
                    *self.owner.get() = scheduler::try_current();
                }
                true
            }
        });
        acquired.then_some(MutexGuard { mutex: self })
    }

    fn unlock(&self) {
        atomic(|| {
            // SAFETY: see `lock`.
            unsafe {
                if let (Some(holder), Some(me)) = (*self.owner.get(), scheduler::try_current()) {
                    crate::kernel_assert!(holder == me, "mutex unlocked by a thread that isn't its owner");
                }
                *self.owner.get() = None;
                *self.locked.get() = false;
                (*self.waiters.get()).wakeup_one();
            }
        });
    }
}

#[must_use = "a MutexGuard must be held for the critical section's duration"]
pub struct MutexGuard<'a, T> {
    mutex: &'a Mutex<T>,
}

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: holding the guard proves exclusive access to `data`.
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: holding the guard proves exclusive access to `data`.
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

/// A condition variable, used with an explicitly-passed mutex guard at each
/// wait rather than being bound to one mutex at construction.
pub struct Condvar {
    waiters: UnsafeCell<WaitQueue>,
}

unsafe impl Sync for Condvar {}

impl Condvar {
    pub const fn new() -> Self {
        Self {
            waiters: UnsafeCell::new(WaitQueue::new()),
        }
    }

    /// Atomically release `guard`'s mutex and park on this condvar, then
    /// reacquire the mutex before returning. The release and the enqueue
    /// run in the same atomic region as the caller's condition check, so a
    /// signal sent between them can't be missed.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        let mutex = guard.mutex;
        atomic(|| {
            drop(guard);
            // SAFETY: access confined to this atomic region.
            scheduler::wait(unsafe { &mut *self.waiters.get() });
        });
        mutex.lock()
    }

    pub fn notify_one(&self) {
        // SAFETY: access confined to this atomic region.
        atomic(|| unsafe { (*self.waiters.get()).wakeup_one() });
    }

    pub fn notify_all(&self) {
        // SAFETY: access confined to this atomic region.
        atomic(|| unsafe { (*self.waiters.get()).wakeup_all() });
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn try_lock_fails_while_held() {
        let m = Mutex::new(0u32);
        let guard = m.lock();
        assert!(m.try_lock().is_none());
        drop(guard);
        assert!(m.try_lock().is_some());
    }
}
