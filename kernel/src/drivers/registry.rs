//! Device registry (§4.K).
//!
//! A mutex-protected linked list of `(name, kind, object)` records.
//! `register` fails with `Exist` on a duplicate name. `lookup`/`for_each`
//! iterate under the mutex, with the caller's callback returning a
//! continue/stop signal so search and enumeration share one primitive.

use alloc::boxed::Box;
use alloc::string::String;

use crate::error::{KernelError, KernelResult};
use crate::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Console,
    Keyboard,
    Block,
}

pub struct Device {
    pub name: String,
    pub kind: DeviceKind,
    pub object: Box<dyn core::any::Any + Send>,
}

/// Returned by a registry callback: whether iteration should keep going.
pub enum Signal {
    Continue,
    Stop,
}

static REGISTRY: Mutex<alloc::vec::Vec<Device>> = Mutex::new(alloc::vec::Vec::new());

/// Register a device under `name`. Fails if the name is already taken.
pub fn register(name: &str, kind: DeviceKind, object: Box<dyn core::any::Any + Send>) -> KernelResult<()> {
    let mut devices = REGISTRY.lock();
    if devices.iter().any(|d| d.name == name) {
        return Err(KernelError::Exist { resource: "device" });
    }
    devices.push(Device { name: String::from(name), kind, object });
    Ok(())
}

/// Iterate all registered devices under the mutex, stopping early if `f`
/// returns [`Signal::Stop`].
pub fn for_each(mut f: impl FnMut(&Device) -> Signal) {
    let devices = REGISTRY.lock();
    for device in devices.iter() {
        if matches!(f(&device), Signal::Stop) {
            break;
        }
    }
}

/// Find a device by name.
pub fn lookup(name: &str) -> Option<DeviceKind> {
    let devices = REGISTRY.lock();
    devices.iter().find(|d| d.name == name).map(|d| d.kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn duplicate_name_rejected() {
        assert!(register("dup-test-device", DeviceKind::Console, Box::new(())).is_ok());
        assert!(matches!(
            register("dup-test-device", DeviceKind::Console, Box::new(())),
            Err(KernelError::Exist { .. })
        ));
    }

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn lookup_finds_registered_device() {
        register("lookup-test-device", DeviceKind::Keyboard, Box::new(())).ok();
        assert_eq!(lookup("lookup-test-device"), Some(DeviceKind::Keyboard));
        assert_eq!(lookup("nonexistent"), None);
    }
}
