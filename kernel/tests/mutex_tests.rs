//! Mutex/condvar integration tests: mutual exclusion and wakeup ordering
//! across real threads under a booted kernel.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(strata_kernel::test_runner)]
#![reexport_test_harness_main = "test_main"]

extern crate alloc;

use core::sync::atomic::{AtomicBool, Ordering};

use alloc::collections::VecDeque;

use bootloader_api::{entry_point, BootInfo};

use strata_kernel::sched::{self, SpawnMode};
use strata_kernel::sync::mutex::{Condvar, Mutex};

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

static COUNTER: Mutex<usize> = Mutex::new(0);

#[test_case]
fn mutex_serializes_concurrent_increments() {
    *COUNTER.lock() = 0;

    extern "C" fn worker() -> ! {
        for _ in 0..200 {
            let mut guard = COUNTER.lock();
            *guard += 1;
            sched::yield_now();
        }
        sched::exit(0);
    }

    let a = sched::spawn(worker, SpawnMode::Attached);
    let b = sched::spawn(worker, SpawnMode::Attached);
    sched::join(a);
    sched::join(b);
    assert_eq!(*COUNTER.lock(), 400);
}

static HOLDER_HAS_LOCK: AtomicBool = AtomicBool::new(false);
static HOLDER_MAY_RELEASE: AtomicBool = AtomicBool::new(false);
static CONTENDED: Mutex<u32> = Mutex::new(0);

#[test_case]
fn try_lock_fails_while_another_thread_holds_it() {
    HOLDER_HAS_LOCK.store(false, Ordering::SeqCst);
    HOLDER_MAY_RELEASE.store(false, Ordering::SeqCst);

    extern "C" fn holder() -> ! {
        let _guard = CONTENDED.lock();
        HOLDER_HAS_LOCK.store(true, Ordering::SeqCst);
        while !HOLDER_MAY_RELEASE.load(Ordering::SeqCst) {
            sched::yield_now();
        }
        drop(_guard);
        sched::exit(0);
    }

    let handle = sched::spawn(holder, SpawnMode::Attached);
    while !HOLDER_HAS_LOCK.load(Ordering::SeqCst) {
        sched::yield_now();
    }
    assert!(CONTENDED.try_lock().is_none());

    HOLDER_MAY_RELEASE.store(true, Ordering::SeqCst);
    sched::join(handle);
    assert!(CONTENDED.try_lock().is_some());
}

struct Queue {
    items: VecDeque<i32>,
}

static QUEUE: Mutex<Queue> = Mutex::new(Queue { items: VecDeque::new() });
static QUEUE_READY: Condvar = Condvar::new();

#[test_case]
fn condvar_wakes_consumer_once_producer_pushes() {
    QUEUE.lock().items.clear();

    extern "C" fn consumer() -> ! {
        let mut guard = QUEUE.lock();
        while guard.items.is_empty() {
            guard = QUEUE_READY.wait(guard);
        }
        let value = guard.items.pop_front().unwrap();
        drop(guard);
        sched::exit(value);
    }

    extern "C" fn producer() -> ! {
        for _ in 0..30 {
            sched::yield_now();
        }
        QUEUE.lock().items.push_back(99);
        QUEUE_READY.notify_one();
        sched::exit(0);
    }

    let consumer_handle = sched::spawn(consumer, SpawnMode::Attached);
    let producer_handle = sched::spawn(producer, SpawnMode::Attached);
    assert_eq!(sched::join(consumer_handle), 99);
    sched::join(producer_handle);
}
