//! `log::Log` implementation backed by the serial port.
//!
//! Kernel code calls `log::info!`/`log::warn!`/etc. directly; this module
//! only wires that up to an output at boot. Kept distinct from
//! [`crate::drivers::console`]'s `printf`, which is the user-facing screen
//! path, not a diagnostic log.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct SerialLogger;

static LOGGER: SerialLogger = SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        crate::serial_println!("[{:<5} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Install the global logger. Call once, after [`crate::serial::init`].
///
/// # Safety
///
/// Must be called at most once.
pub unsafe fn init() {
    log::set_logger(&LOGGER).expect("logger already set");
    log::set_max_level(LevelFilter::Info);
}
