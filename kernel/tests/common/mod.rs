//! Shared boot sequence for integration test binaries.
//!
//! Each `tests/*.rs` file is its own freestanding binary and needs its own
//! entry point; this module is the one piece of boot plumbing (frame
//! allocator, heap, serial, scheduler) they all share, so it mirrors
//! `main.rs`'s sequence rather than each test file reimplementing it.

use bootloader_api::config::Mapping;
use bootloader_api::{BootInfo, BootloaderConfig};

use strata_kernel::{arch, log_setup, mm, sched, serial};

pub static BOOT_CONFIG: BootloaderConfig = {
    let mut config = BootloaderConfig::new_default();
    config.mappings.physical_memory = Some(Mapping::Dynamic);
    config
};

/// Bring up everything a test needs short of `arch::enable_irqs`, which
/// callers run once their own static state is ready to receive interrupts.
pub fn boot(boot_info: &'static mut BootInfo) {
    arch::init();
    arch::timer::init(strata_kernel::config::TIMER_INTERVAL_MS);

    let regions = boot_info
        .memory_regions
        .iter()
        .filter(|r| r.kind == bootloader_api::info::MemoryRegionKind::Usable)
        .map(|r| (r.start as usize, (r.end - r.start) as usize));
    // SAFETY: first and only frame allocator init call in this binary.
    unsafe { mm::frame::init(regions) };
    // SAFETY: frame allocator is up; nothing has touched the heap yet.
    unsafe { mm::heap::init() };

    // SAFETY: called once, before the first log line.
    unsafe { serial::init() };
    // SAFETY: called once, right after serial is up.
    unsafe { log_setup::init() };

    sched::init();
}
