//! COM1 serial output, used by [`crate::log_setup`] and the `serial_print!`
//! macros. Kept separate from [`crate::drivers::console`]: serial is a
//! debug/log sink, the console is the user-facing screen.

use core::fmt::{self, Write};

use spin::Mutex;
use x86_64::instructions::interrupts;

static PORT: Mutex<Option<uart_16550::SerialPort>> = Mutex::new(None);

/// # Safety
///
/// Must be called exactly once, before the first log line or
/// `serial_print!`.
pub unsafe fn init() {
    *PORT.lock() = Some(crate::arch::x86_64::serial_init());
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    interrupts::without_interrupts(|| {
        let mut guard = PORT.lock();
        if let Some(port) = guard.as_mut() {
            let _ = port.write_fmt(args);
        }
    });
}
