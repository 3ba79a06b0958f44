//! Kernel binary entry point.
//!
//! `bootloader_api::entry_point!` hands us a `&'static mut BootInfo` with
//! the firmware/UEFI memory map and physical-memory-offset mapping already
//! established; everything from there is this crate's own init sequence.

#![no_std]
#![no_main]

use bootloader_api::{entry_point, BootInfo, BootloaderConfig};
use bootloader_api::config::Mapping;

use strata_kernel::{arch, drivers, log_setup, mm, sched, serial};

static BOOTLOADER_CONFIG: BootloaderConfig = {
    let mut config = BootloaderConfig::new_default();
    config.mappings.physical_memory = Some(Mapping::Dynamic);
    config
};

entry_point!(kernel_main, config = &BOOTLOADER_CONFIG);

fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    arch::init();
    arch::timer::init(strata_kernel::config::TIMER_INTERVAL_MS);

    let regions = boot_info
        .memory_regions
        .iter()
        .filter(|r| r.kind == bootloader_api::info::MemoryRegionKind::Usable)
        .map(|r| (r.start as usize, (r.end - r.start) as usize));
    // SAFETY: called once, before any other frame allocator entry point,
    // with the bootloader's own memory map.
    unsafe { mm::frame::init(regions) };
    // SAFETY: frame allocator is initialized; nothing has allocated from
    // the heap yet.
    unsafe { mm::heap::init() };

    // SAFETY: called once, before the first log line.
    unsafe { serial::init() };
    // SAFETY: called once, right after serial is up.
    unsafe { log_setup::init() };

    log::info!("strata_kernel {}", env!("CARGO_PKG_VERSION"));

    drivers::init();
    sched::init();

    arch::enable_irqs();

    loop {
        arch::idle();
    }
}

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    log::error!("panic: {info}");
    arch::halt();
}
