//! Kernel heap: a single carved-out region backed by frames taken from the
//! frame allocator's `AVAIL` list, handed to `linked_list_allocator` as the
//! global allocator's backing store.

use crate::config::HEAP_SIZE;
use crate::mm::frame::{self, FrameState, FRAME_SIZE};

/// Carve `HEAP_SIZE` bytes out of the frame allocator and hand them to the
/// global allocator.
///
/// # Safety
///
/// Must be called exactly once, after `frame::init`, before the first heap
/// allocation.
#[cfg(target_os = "none")]
pub unsafe fn init() {
    let frames = HEAP_SIZE.div_ceil(FRAME_SIZE);
    let base = unsafe { frame::alloc(FrameState::Heap).as_ref() }.phys_addr();
    let mut expect = base + FRAME_SIZE;
    for _ in 1..frames {
        let f = frame::alloc(FrameState::Heap);
        // SAFETY: `frame::init` threads `AVAIL` in increasing frame-number
        // order and nothing else allocates before boot reaches here, so
        // consecutive `alloc` calls return physically contiguous frames.
        let got = unsafe { f.as_ref() }.phys_addr();
        debug_assert_eq!(got, expect, "heap frame not contiguous");
        expect += FRAME_SIZE;
    }
    log::info!("heap: {} frames ({} bytes) at {:#x}", frames, frames * FRAME_SIZE, base);
    // SAFETY: `base..base + frames * FRAME_SIZE` was just carved out above
    // and is not referenced anywhere else.
    unsafe {
        crate::get_allocator().lock().init(base as *mut u8, frames * FRAME_SIZE);
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use alloc::{boxed::Box, vec::Vec};

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn host_heap_allocates() {
        let x = Box::new(42);
        assert_eq!(*x, 42);
        let mut v = Vec::new();
        for i in 0..100 {
            v.push(i);
        }
        assert_eq!(v.len(), 100);
    }
}
