//! Page-cache integration tests: pagein through a real `RamBlockDevice`,
//! exercised from multiple threads so the `PendingInit`/`Clean` protocol and
//! its condvar-based wakeup actually run through the scheduler.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(strata_kernel::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

use core::sync::atomic::{AtomicUsize, Ordering};

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;

use bootloader_api::{entry_point, BootInfo};
use lazy_static::lazy_static;

use strata_kernel::fs::blockdev::RamBlockDevice;
use strata_kernel::fs::pager::BlockDevicePager;
use strata_kernel::fs::pagecache::PageCache;
use strata_kernel::mm::frame::FRAME_SIZE;
use strata_kernel::sched::{self, SpawnMode};

#[path = "common/mod.rs"]
mod common;

entry_point!(kernel_main, config = &common::BOOT_CONFIG);

fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    common::boot(boot_info);
    test_main();
    strata_kernel::exit_qemu(strata_kernel::QemuExitCode::Success)
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    strata_kernel::test_panic_handler(info)
}

const NUM_PAGES: u64 = 4;

lazy_static! {
    static ref CACHE: PageCache = {
        let blocks_per_page = (FRAME_SIZE / 512) as u64;
        let dev = Arc::new(RamBlockDevice::new(
            String::from("pagecache-test"),
            512,
            blocks_per_page * NUM_PAGES,
        ));
        let pager = BlockDevicePager::new(dev, 0, blocks_per_page * NUM_PAGES).unwrap();
        PageCache::new(Box::new(pager))
    };
}

static FRAME_ADDRS: [AtomicUsize; 2] = [AtomicUsize::new(0), AtomicUsize::new(0)];

#[test_case]
fn concurrent_lock_page_shares_one_resident_frame() {
    extern "C" fn locker_0() -> ! {
        let frame = CACHE.lock_page(2).expect("pagein failed");
        FRAME_ADDRS[0].store(frame.as_ptr() as usize, Ordering::SeqCst);
        for _ in 0..4 {
            sched::yield_now();
        }
        CACHE.unlock_page(frame);
        sched::exit(0);
    }
    extern "C" fn locker_1() -> ! {
        let frame = CACHE.lock_page(2).expect("pagein failed");
        FRAME_ADDRS[1].store(frame.as_ptr() as usize, Ordering::SeqCst);
        for _ in 0..4 {
            sched::yield_now();
        }
        CACHE.unlock_page(frame);
        sched::exit(0);
    }

    let a = sched::spawn(locker_0, SpawnMode::Attached);
    let b = sched::spawn(locker_1, SpawnMode::Attached);
    sched::join(a);
    sched::join(b);

    let first = FRAME_ADDRS[0].load(Ordering::SeqCst);
    let second = FRAME_ADDRS[1].load(Ordering::SeqCst);
    assert_ne!(first, 0);
    assert_eq!(first, second, "concurrent lockers of the same page must share a frame");
}

#[test_case]
fn distinct_pages_get_distinct_frames() {
    let a = CACHE.lock_page(0).expect("pagein failed");
    let b = CACHE.lock_page(1).expect("pagein failed");
    assert_ne!(a.as_ptr(), b.as_ptr());
    CACHE.unlock_page(a);
    CACHE.unlock_page(b);
}

#[test_case]
fn page_survives_lock_unlock_lock_cycle() {
    let a = CACHE.lock_page(3).expect("pagein failed");
    CACHE.unlock_page(a);
    let b = CACHE.lock_page(3).expect("pagein failed");
    // The page is still resident (no eviction on a clean zero-refcount
    // page), so the second lock must return the same frame.
    assert_eq!(a.as_ptr(), b.as_ptr());
    CACHE.unlock_page(b);
}
