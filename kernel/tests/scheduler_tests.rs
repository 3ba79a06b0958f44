//! Scheduler integration tests: spawn/join, detached threads, and
//! round-robin ordering across real context switches under a booted kernel.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(strata_kernel::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bootloader_api::{entry_point, BootInfo};

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

#[test_case]
fn attached_thread_join_returns_exit_code() {
    extern "C" fn body() -> ! {
        sched::exit(42);
    }
    let handle = sched::spawn(body, SpawnMode::Attached);
    assert_eq!(sched::join(handle), 42);
}

#[test_case]
fn join_on_already_exited_thread_does_not_block() {
    extern "C" fn body() -> ! {
        sched::exit(0);
    }
    let handle = sched::spawn(body, SpawnMode::Attached);
    // Give the thread a chance to run to completion before we join.
    for _ in 0..8 {
        sched::yield_now();
    }
    assert_eq!(sched::join(handle), 0);
}

static DETACHED_RAN: AtomicBool = AtomicBool::new(false);

#[test_case]
fn detached_thread_runs_without_a_joiner() {
    extern "C" fn body() -> ! {
        DETACHED_RAN.store(true, Ordering::SeqCst);
        sched::exit(0);
    }
    sched::spawn(body, SpawnMode::Detached);
    for _ in 0..16 {
        if DETACHED_RAN.load(Ordering::SeqCst) {
            break;
        }
        sched::yield_now();
    }
    assert!(DETACHED_RAN.load(Ordering::SeqCst));
}

static COUNTER: AtomicUsize = AtomicUsize::new(0);

#[test_case]
fn two_threads_interleave_via_yield() {
    COUNTER.store(0, Ordering::SeqCst);

    extern "C" fn worker() -> ! {
        for _ in 0..50 {
            COUNTER.fetch_add(1, Ordering::SeqCst);
            sched::yield_now();
        }
        sched::exit(0);
    }

    let a = sched::spawn(worker, SpawnMode::Attached);
    let b = sched::spawn(worker, SpawnMode::Attached);
    sched::join(a);
    sched::join(b);
    assert_eq!(COUNTER.load(Ordering::SeqCst), 100);
}
