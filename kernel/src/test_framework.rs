//! Custom `#[test_case]` harness for `tests/*.rs` integration binaries.
//!
//! In-module unit tests (`#[cfg(test)] mod tests`) scattered through the
//! crate use the same `#[test_case]` attribute and share [`Testable`] and
//! [`test_runner`], but run on the host target via the standard `#[test]`
//! harness instead -- only `target_os = "none"` integration binaries drive
//! QEMU exit codes.

use crate::{serial_print, serial_println};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    Success = 0x10,
    Failed = 0x11,
}

pub trait Testable {
    fn run(&self);
}

impl<T: Fn()> Testable for T {
    fn run(&self) {
        serial_print!("{}...\t", core::any::type_name::<T>());
        self();
        serial_println!("[ok]");
    }
}

pub fn test_runner(tests: &[&dyn Testable]) {
    serial_println!("Running {} tests", tests.len());
    for test in tests {
        test.run();
    }
    exit_qemu(QemuExitCode::Success);
}

pub fn test_panic_handler(info: &core::panic::PanicInfo) -> ! {
    serial_println!("[failed]\n");
    serial_println!("Error: {}\n", info);
    exit_qemu(QemuExitCode::Failed);
}

/// Write the QEMU debug-exit device (`-device isa-debug-exit`), terminating
/// the VM with `(code << 1) | 1` as the process exit status.
pub fn exit_qemu(exit_code: QemuExitCode) -> ! {
    use x86_64::instructions::port::Port;
    // SAFETY: port 0xf4 is the debug-exit device configured in the test
    // runner's QEMU invocation; writing to it halts the VM and never
    // returns.
    unsafe {
        let mut port = Port::new(0xf4);
        port.write(exit_code as u32);
    }
    loop {
        core::hint::spin_loop();
    }
}
