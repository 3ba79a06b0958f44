//! Physical frame allocator.
//!
//! One [`Frame`] struct per physical page, held in a single `'static` array
//! indexed by frame number. Free frames are threaded onto a global
//! [`IntrusiveList`] (`AVAIL`); `alloc`/`free` block via the same mutex used
//! everywhere else rather than spinning, since a caller that can't get a
//! frame has nothing useful to do except wait for one to be freed.

use core::ptr::NonNull;

use crate::{
    error::{KernelError, KernelResult},
    sync::{
        atomic::atomic,
        intrusive_list::{Linked, Links},
        mutex::{Condvar, Mutex},
    },
};

pub const FRAME_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// On the free list.
    Avail,
    /// In use by the kernel image / boot data, never freed.
    Kern,
    /// Mapped to a hardware device (MMIO), never freed.
    Hw,
    /// Reserved by the bootloader, not available and not kernel-owned.
    Unused,
    /// Backing the kernel heap.
    Heap,
    /// Backing a thread's kernel stack.
    KStack,
    /// Backing a page-cache slot.
    PgCache,
}

/// Content tag for a [`FrameState::PgCache`] frame, tracking the pagein
/// protocol in `fs::pagecache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageCacheTag {
    PendingInit,
    Clean,
    Dirty,
    FailedInit,
}

pub struct Frame {
    pub number: usize,
    pub state: FrameState,
    pub pagecache_tag: Option<PageCacheTag>,
    /// Which page-cache logical page this frame holds, while `state ==
    /// PgCache`. Set once on allocation, cleared on free.
    pub pagecache_page: Option<u32>,
    pub refcount: u32,
    /// Error code cached from a failed pagein, surfaced to the next waiter
    /// instead of retrying (mirrors the page-cache's FAILED_INIT handling).
    pub error: Option<KernelError>,

    links: Links<Frame>,
}

unsafe impl Send for Frame {}

unsafe impl Linked for Frame {
    fn links(&self) -> &Links<Self> {
        &self.links
    }
    fn links_mut(&mut self) -> &mut Links<Self> {
        &mut self.links
    }
}

impl Frame {
    const fn new(number: usize) -> Self {
        Self {
            number,
            state: FrameState::Unused,
            pagecache_tag: None,
            pagecache_page: None,
            refcount: 0,
            error: None,
            links: Links::new(),
        }
    }

    pub fn phys_addr(&self) -> usize {
        self.number * FRAME_SIZE
    }
}

const MAX_FRAMES: usize = 1 << 18; // 1 TiB of addressable physical memory at 4 KiB/frame.

struct FrameTable {
    frames: &'static mut [Frame],
    avail: crate::sync::intrusive_list::IntrusiveList<Frame>,
}

static FRAME_TABLE: Mutex<Option<FrameTable>> = Mutex::new(None);
static FRAME_AVAILABLE: Condvar = Condvar::new();

static mut FRAME_STORAGE: [Frame; MAX_FRAMES] = {
    const INIT: Frame = Frame::new(0);
    [INIT; MAX_FRAMES]
};

/// Initialize the frame table from the bootloader's usable-memory regions.
///
/// # Safety
///
/// Must be called exactly once, before any other frame allocator entry
/// point, with a memory map that accurately describes physical RAM.
pub unsafe fn init(regions: impl Iterator<Item = (usize, usize)>) {
    // SAFETY: called once during early boot before any other core touches
    // `FRAME_STORAGE`.
    let storage = unsafe { &mut *core::ptr::addr_of_mut!(FRAME_STORAGE) };
    for (i, frame) in storage.iter_mut().enumerate() {
        frame.number = i;
    }

    let mut avail = crate::sync::intrusive_list::IntrusiveList::new();
    let mut highest = 0usize;
    for (start, len) in regions {
        let first = start.div_ceil(FRAME_SIZE);
        let last = (start + len) / FRAME_SIZE;
        for number in first..last.min(MAX_FRAMES) {
            let frame = &mut storage[number];
            frame.state = FrameState::Avail;
            avail.append(NonNull::from(&mut *frame));
            highest = highest.max(number);
        }
    }
    log::info!(
        "frame allocator: {} frames available, highest frame {}",
        avail.len(),
        highest
    );

    *FRAME_TABLE.lock() = Some(FrameTable {
        frames: storage,
        avail,
    });
}

/// Mark `number` as permanently unavailable (kernel image, MMIO, etc.)
/// rather than returning it to the free list. Must run before any `alloc`
/// call can reach that frame.
pub fn reserve(number: usize, state: FrameState) {
    atomic(|| {
        let mut table = FRAME_TABLE.lock();
        let table = table.as_mut().expect("frame allocator not initialized");
        if let FrameState::Avail = table.frames[number].state {
            table.avail.remove(NonNull::from(&mut table.frames[number]));
        }
        table.frames[number].state = state;
    });
}

/// Allocate one frame, blocking until one is available.
pub fn alloc(state: FrameState) -> NonNull<Frame> {
    let mut table = FRAME_TABLE.lock();
    loop {
        let inner = table.as_mut().expect("frame allocator not initialized");
        if let Some(mut node) = atomic(|| inner.avail.first().map(|n| {
            inner.avail.remove(n);
            n
        })) {
            // SAFETY: `node` was just unlinked from `avail` under the atomic
            // region above; no other holder of `table` can observe it.
            let frame = unsafe { node.as_mut() };
            frame.state = state;
            frame.refcount = 1;
            frame.pagecache_tag = None;
            frame.pagecache_page = None;
            frame.error = None;
            return node;
        }
        table = FRAME_AVAILABLE.wait(table);
    }
}

/// Return a frame to the free list. The frame must have been obtained from
/// [`alloc`] and must not still be referenced anywhere.
pub fn free(mut frame: NonNull<Frame>) {
    let mut table = FRAME_TABLE.lock();
    let inner = table.as_mut().expect("frame allocator not initialized");
    // SAFETY: caller gives up the only remaining reference to `frame`.
    let f = unsafe { frame.as_mut() };
    crate::kernel_assert!(f.refcount == 0, "freed frame with outstanding references");
    f.state = FrameState::Avail;
    f.pagecache_tag = None;
    f.pagecache_page = None;
    atomic(|| inner.avail.append(frame));
    FRAME_AVAILABLE.notify_one();
}

/// Look up a frame by number, for code that only knows the frame number
/// (block-device LBA mapping, page-cache lookups).
pub fn by_number(number: usize) -> KernelResult<NonNull<Frame>> {
    let mut table = FRAME_TABLE.lock();
    let inner = table.as_mut().ok_or(KernelError::NotSup { operation: "frame allocator not initialized" })?;
    if number >= inner.frames.len() {
        return Err(KernelError::Inval { detail: "frame number out of range" });
    }
    Ok(NonNull::from(&mut inner.frames[number]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_regions() -> impl Iterator<Item = (usize, usize)> {
        core::iter::once((0usize, 16 * FRAME_SIZE))
    }

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn alloc_then_free_returns_to_avail() {
        unsafe { init(test_regions()) };
        let a = alloc(FrameState::Heap);
        let b = alloc(FrameState::Heap);
        unsafe {
            a.clone().as_mut().refcount = 0;
            b.clone().as_mut().refcount = 0;
        }
        free(a);
        free(b);
        let c = alloc(FrameState::Heap);
        unsafe { c.clone().as_mut().refcount = 0 };
        free(c);
    }
}
