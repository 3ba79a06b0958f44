//! A small teaching kernel: single-CPU FIFO scheduler, sleep-based
//! mutex/condvar, physical frame allocator, a block-device request
//! pipeline with work-queue deferral, and a page-cache sitting between a
//! pager and the frame allocator.

#![no_std]
#![cfg_attr(all(test, target_os = "none"), no_main)]
#![feature(custom_test_frameworks)]
#![feature(abi_x86_interrupt)]
#![cfg_attr(target_os = "none", feature(alloc_error_handler))]
// naked_functions is stable since Rust 1.88.0, no feature flag needed
// Custom test runner only for bare-metal; host target uses standard #[test] harness.
#![cfg_attr(target_os = "none", test_runner(crate::test_runner))]
#![cfg_attr(target_os = "none", reexport_test_harness_main = "test_main")]

extern crate alloc;

// Bare metal: a carved-out heap region, grown by `mm::heap::init`.
// Host (`cargo test` on the default target, for in-module unit tests that
// don't need a booted machine): delegate to the system allocator.
#[cfg(target_os = "none")]
use linked_list_allocator::LockedHeap;

#[cfg(target_os = "none")]
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

#[cfg(not(target_os = "none"))]
extern crate std;
#[cfg(not(target_os = "none"))]
#[global_allocator]
static SYSTEM_ALLOCATOR: std::alloc::System = std::alloc::System;

#[cfg(target_os = "none")]
pub fn get_allocator() -> &'static LockedHeap {
    &ALLOCATOR
}

#[macro_use]
pub mod print;

mod intrinsics;

pub mod arch;
pub mod drivers;
pub mod error;
pub mod fs;
pub mod log_setup;
pub mod mm;
pub mod sched;
pub mod serial;
pub mod sync;
pub mod utils;

mod test_framework;

/// Compile-time subsystem constants for fixed sizes (`FRAME_SIZE`,
/// `HEAP_SIZE`, ...) rather than runtime configuration.
pub mod config {
    /// Timer ticks per scheduling quantum.
    pub const QUANTUM_TICKS: u32 = 10;
    /// PIT interval, matching `arch::x86_64::timer::init`'s argument.
    pub const TIMER_INTERVAL_MS: u32 = 10;
    /// VGA text-mode geometry.
    pub const CONSOLE_ROWS: usize = 25;
    pub const CONSOLE_COLS: usize = 80;
    /// Kernel heap size, carved from the frame allocator at boot.
    pub const HEAP_SIZE: usize = 1024 * 1024;
}

#[cfg(test)]
pub use test_framework::test_runner;
pub use test_framework::{exit_qemu, test_panic_handler, QemuExitCode, Testable};

/// Heap allocation error handler.
///
/// Panic is intentional: heap allocation failure in a no_std kernel is
/// unrecoverable. The alloc_error_handler ABI requires `-> !`.
#[cfg(target_os = "none")]
#[alloc_error_handler]
fn alloc_error_handler(layout: core::alloc::Layout) -> ! {
    panic!("allocation error: {:?}", layout);
}

#[cfg(all(test, target_os = "none"))]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    test_main();
    loop {
        core::hint::spin_loop();
    }
}

#[cfg(all(test, target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    test_framework::test_panic_handler(info)
}
