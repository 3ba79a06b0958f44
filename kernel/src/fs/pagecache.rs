//! Page-cache (§4.H), sitting between a [`Pager`] and the frame allocator.
//!
//! Ported from GeekOS `vm.c`: `lock_page` either finds an already-resident
//! frame for `page_num` and bumps its refcount, or allocates a fresh frame,
//! appends it to the resident list tagged `PendingInit`, unlocks the cache
//! while the pager does its I/O, then re-locks to record the outcome and
//! wake any other thread waiting on the same page. At most one pagein is
//! ever in flight per page number, and every concurrent waiter on a failed
//! pagein observes the same error.

use core::ptr::NonNull;

use alloc::boxed::Box;

use crate::error::{KernelError, KernelResult};
use crate::fs::pager::Pager;
use crate::mm::frame::{self, Frame, FrameState, PageCacheTag, FRAME_SIZE};
use crate::sync::intrusive_list::IntrusiveList;
use crate::sync::mutex::{Condvar, Mutex};

struct Inner {
    resident: IntrusiveList<Frame>,
}

pub struct PageCache {
    pager: Box<dyn Pager>,
    inner: Mutex<Inner>,
    cond: Condvar,
}

impl PageCache {
    pub fn new(pager: Box<dyn Pager>) -> Self {
        Self {
            pager,
            inner: Mutex::new(Inner { resident: IntrusiveList::new() }),
            cond: Condvar::new(),
        }
    }

    fn find(inner: &Inner, page_num: u32) -> Option<NonNull<Frame>> {
        let mut cur = inner.resident.first();
        while let Some(node) = cur {
            // SAFETY: every node in `resident` is a frame this cache owns.
            if unsafe { node.as_ref() }.pagecache_page == Some(page_num) {
                return Some(node);
            }
            cur = inner.resident.next(node);
        }
        None
    }

    /// Drop one reference to `frame`. If it hits zero while its pagein
    /// failed, evict it from the resident list and return it to the frame
    /// allocator -- GeekOS's `vm_release_frame_ref`.
    fn release(&self, inner: &mut Inner, mut frame: NonNull<Frame>) {
        // SAFETY: caller holds `self.inner`.
        let f = unsafe { frame.as_mut() };
        crate::kernel_assert!(f.refcount > 0, "page-cache release of unreferenced frame");
        crate::kernel_assert!(f.pagecache_tag != Some(PageCacheTag::PendingInit), "release during pending pagein");
        f.refcount -= 1;
        if f.refcount == 0 && f.pagecache_tag == Some(PageCacheTag::FailedInit) {
            inner.resident.remove(frame);
            frame::free(frame);
        }
    }

    fn alloc_and_page_in(&self, mut guard: crate::sync::mutex::MutexGuard<'_, Inner>, page_num: u32) -> KernelResult<NonNull<Frame>> {
        let mut frame = frame::alloc(FrameState::PgCache);
        // SAFETY: freshly allocated, not yet visible to any other thread.
        unsafe {
            frame.as_mut().pagecache_page = Some(page_num);
            frame.as_mut().pagecache_tag = Some(PageCacheTag::PendingInit);
        }
        guard.resident.append(frame);

        // Drop the lock while the pager does its I/O: other lockers see
        // `PendingInit` and park on `self.cond` instead of racing in here.
        drop(guard);

        let mut page_buf = [0u8; FRAME_SIZE];
        let rc = self.pager.read_page(page_num, &mut page_buf);

        let mut guard = self.inner.lock();
        // SAFETY: `phys_addr` identifies this frame's physical page, mapped
        // 1:1 in the kernel's address space.
        let phys = unsafe { frame.as_ref() }.phys_addr() as *mut u8;
        if rc.is_ok() {
            unsafe { core::ptr::copy_nonoverlapping(page_buf.as_ptr(), phys, FRAME_SIZE) };
        }

        // SAFETY: `frame` is still exclusively ours; no other thread
        // touches a `PendingInit` frame.
        unsafe {
            frame.as_mut().pagecache_tag =
                Some(if rc.is_ok() { PageCacheTag::Clean } else { PageCacheTag::FailedInit });
            if let Err(err) = rc {
                frame.as_mut().error = Some(err);
            }
        }
        self.cond.notify_all();

        let result = match rc {
            Ok(()) => Ok(frame),
            Err(err) => {
                self.release(&mut guard, frame);
                Err(err)
            }
        };
        drop(guard);
        result
    }

    /// Lock `page_num` into residency, blocking for pagein if necessary, and
    /// return the frame holding its data with one reference held on the
    /// caller's behalf.
    pub fn lock_page(&self, page_num: u32) -> KernelResult<NonNull<Frame>> {
        let mut guard = self.inner.lock();
        match Self::find(&guard, page_num) {
            Some(mut frame) => {
                // SAFETY: confined to this critical section.
                unsafe { frame.as_mut().refcount += 1 };
                loop {
                    let tag = unsafe { frame.as_ref() }.pagecache_tag;
                    match tag {
                        Some(PageCacheTag::PendingInit) => guard = self.cond.wait(guard),
                        Some(PageCacheTag::FailedInit) => {
                            let err = unsafe { frame.as_ref() }.error.unwrap_or(KernelError::Io);
                            self.release(&mut guard, frame);
                            return Err(err);
                        }
                        _ => return Ok(frame),
                    }
                }
            }
            None => self.alloc_and_page_in(guard, page_num),
        }
    }

    /// Release one reference taken by [`Self::lock_page`].
    pub fn unlock_page(&self, frame: NonNull<Frame>) {
        let mut guard = self.inner.lock();
        self.release(&mut guard, frame);
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::sync::Arc;

    use super::*;
    use crate::fs::blockdev::RamBlockDevice;
    use crate::fs::pager::BlockDevicePager;

    fn fresh_cache(num_pages: u64) -> PageCache {
        let blocks_per_page = (FRAME_SIZE / 512) as u64;
        let dev = Arc::new(RamBlockDevice::new(String::from("t"), 512, blocks_per_page * num_pages));
        let pager = BlockDevicePager::new(dev, 0, blocks_per_page * num_pages).unwrap();
        PageCache::new(Box::new(pager))
    }

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn lock_then_unlock_round_trips_data() {
        let cache = fresh_cache(2);
        let frame = cache.lock_page(0).unwrap();
        // SAFETY: we hold a reference; nothing else touches this frame.
        let phys = unsafe { frame.as_ref() }.phys_addr();
        let byte = unsafe { core::ptr::read(phys as *const u8) };
        assert_eq!(byte, 0); // ramdisk starts zeroed
        cache.unlock_page(frame);
    }

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn repeated_lock_same_page_shares_frame() {
        let cache = fresh_cache(2);
        let a = cache.lock_page(1).unwrap();
        let b = cache.lock_page(1).unwrap();
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_eq!(unsafe { a.as_ref() }.refcount, 2);
        cache.unlock_page(a);
        cache.unlock_page(b);
    }
}
