//! Device drivers: console, keyboard, block storage, and the device
//! registry they register themselves into.

pub mod console;
pub mod keyboard;
pub mod registry;
pub mod storage;

/// Bring up drivers in dependency order: console before anything that
/// might log through it, then storage devices register themselves.
pub fn init() {
    unsafe { console::init() };
    unsafe { keyboard::init() };
    storage::init();
}
