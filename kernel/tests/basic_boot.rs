//! Smoke test: does the kernel boot far enough to allocate memory and run a
//! thread at all. No custom test framework here, just a straight-line check
//! -- if any step panics, the panic handler reports the failure to QEMU.

#![no_std]
#![no_main]

extern crate alloc;

use alloc::boxed::Box;
use alloc::vec::Vec;

use bootloader_api::{entry_point, BootInfo};

use strata_kernel::mm::frame::{self, FrameState};
use strata_kernel::sched::{self, SpawnMode};
use strata_kernel::{exit_qemu, serial_println, test_panic_handler, QemuExitCode};

#[path = "common/mod.rs"]
mod common;

entry_point!(kernel_main, config = &common::BOOT_CONFIG);

fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    serial_println!("booting...");
    common::boot(boot_info);
    serial_println!("boot sequence completed");

    let heap_box = Box::new(41u64);
    assert_eq!(*heap_box, 41);
    let mut v = Vec::new();
    v.extend(0..64);
    assert_eq!(v.iter().sum::<i32>(), 2016);
    serial_println!("heap allocator works");

    let frame = frame::alloc(FrameState::Heap);
    let addr = unsafe { frame.as_ref() }.phys_addr();
    assert_eq!(addr % frame::FRAME_SIZE, 0);
    unsafe { frame.clone().as_mut().refcount = 0 };
    frame::free(frame);
    serial_println!("frame allocator works");

    extern "C" fn trivial() -> ! {
        sched::exit(7);
    }
    let handle = sched::spawn(trivial, SpawnMode::Attached);
    let code = sched::join(handle);
    assert_eq!(code, 7);
    serial_println!("scheduler spawn/join works");

    serial_println!("all boot checks passed");
    exit_qemu(QemuExitCode::Success)
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    test_panic_handler(info)
}
