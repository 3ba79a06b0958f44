//! ATA (PATA/IDE) block device driver, plus the ramdisk used for tests.
//!
//! `post` hands the actual port I/O to the work-queue worker rather than
//! performing it on the caller's thread, matching §4.G's "typically by
//! `schedule_work`" routing and keeping interrupt/caller context free of
//! the polling wait loops PIO requires.

use alloc::boxed::Box;
use alloc::string::String;

use crate::error::KernelError;
use crate::fs::blockdev::{BlockDevice, BlockRequest, Direction};
use crate::sched::workqueue;

const SECTOR_SIZE: usize = 512;

pub struct AtaDriver {
    name: String,
    base_port: u16,
    is_master: bool,
    capacity_sectors: u64,
}

impl AtaDriver {
    /// Probe the drive at `base_port` (primary: 0x1F0, secondary: 0x170)
    /// and return a driver for it if present.
    pub fn probe(name: String, base_port: u16, is_master: bool) -> Option<Self> {
        let drive_select = if is_master { 0xA0 } else { 0xB0 };
        unsafe {
            crate::arch::outb(base_port + 6, drive_select);
            if !wait_busy_clear(base_port) {
                return None;
            }
            crate::arch::outb(base_port + 7, 0xEC); // IDENTIFY
            if crate::arch::inb(base_port + 7) == 0 {
                return None; // no device
            }
            if !wait_busy_clear(base_port) {
                return None;
            }
            let mut identify = [0u16; 256];
            for word in identify.iter_mut() {
                *word = crate::arch::inw(base_port);
            }
            let capacity_sectors = identify[60] as u64 | ((identify[61] as u64) << 16);
            Some(Self { name, base_port, is_master, capacity_sectors })
        }
    }

    fn select_lba(&self, lba: u64) {
        let drive_select = if self.is_master { 0xE0 } else { 0xF0 };
        unsafe {
            crate::arch::outb(self.base_port + 6, drive_select | ((lba >> 24) & 0x0F) as u8);
            crate::arch::outb(self.base_port + 2, 1);
            crate::arch::outb(self.base_port + 3, lba as u8);
            crate::arch::outb(self.base_port + 4, (lba >> 8) as u8);
            crate::arch::outb(self.base_port + 5, (lba >> 16) as u8);
        }
    }

    fn transfer_sector(&self, lba: u64, buf: &mut [u8], direction: Direction) -> Result<(), KernelError> {
        self.select_lba(lba);
        unsafe {
            let command = if direction == Direction::Read { 0x20 } else { 0x30 };
            crate::arch::outb(self.base_port + 7, command);
            if !wait_ready(self.base_port) {
                return Err(KernelError::Io);
            }
            match direction {
                Direction::Read => {
                    for i in 0..256 {
                        let word = crate::arch::inw(self.base_port);
                        buf[i * 2] = word as u8;
                        buf[i * 2 + 1] = (word >> 8) as u8;
                    }
                }
                Direction::Write => {
                    for i in 0..256 {
                        let word = buf[i * 2] as u16 | ((buf[i * 2 + 1] as u16) << 8);
                        crate::arch::outw(self.base_port, word);
                    }
                    if !wait_ready(self.base_port) {
                        return Err(KernelError::Io);
                    }
                }
            }
        }
        Ok(())
    }
}

unsafe fn wait_busy_clear(base_port: u16) -> bool {
    for _ in 0..100_000 {
        if crate::arch::inb(base_port + 7) & 0x80 == 0 {
            return true;
        }
        core::hint::spin_loop();
    }
    false
}

unsafe fn wait_ready(base_port: u16) -> bool {
    for _ in 0..100_000 {
        let status = crate::arch::inb(base_port + 7);
        if status & 0x80 == 0 && status & 0x40 != 0 {
            return true;
        }
        core::hint::spin_loop();
    }
    false
}

struct Transfer {
    device: *const AtaDriver,
    request: *const BlockRequest,
}

extern "C" fn service_request(arg: usize) {
    // SAFETY: `arg` was produced by `Box::into_raw` in `post` below and is
    // consumed exactly once, here.
    let transfer = unsafe { Box::from_raw(arg as *mut Transfer) };
    // SAFETY: `device` outlives the request (it's the `'static` driver
    // registered at boot); `request` outlives this call because the
    // poster is blocked in `wait_for_completion` until `notify_complete`.
    let device = unsafe { &*transfer.device };
    let request = unsafe { &*transfer.request };

    let mut rc = Ok(());
    for i in 0..request.count as u64 {
        let lba = request.lba + i;
        let offset = i as usize * SECTOR_SIZE;
        let buffer = &mut request.buffer()[offset..offset + SECTOR_SIZE];
        if let Err(e) = device.transfer_sector(lba, buffer, request.direction) {
            rc = Err(e);
            break;
        }
    }
    request.notify_complete(rc);
}

impl BlockDevice for AtaDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn block_size(&self) -> usize {
        SECTOR_SIZE
    }

    fn block_count(&self) -> u64 {
        self.capacity_sectors
    }

    fn post(&self, req: &BlockRequest) {
        let transfer = Box::new(Transfer { device: self as *const _, request: req as *const _ });
        workqueue::schedule_work(service_request, Box::into_raw(transfer) as usize);
    }
}

/// Probe the standard primary/secondary IDE ports and register whatever is
/// found into the device registry.
pub fn init() {
    for (port, label) in [(0x1F0u16, "ata0"), (0x170u16, "ata1")] {
        if let Some(drive) = AtaDriver::probe(String::from(label), port, true) {
            log::info!("storage: found {} at port {:#x} ({} sectors)", label, port, drive.block_count());
            let _ = crate::drivers::registry::register(
                label,
                crate::drivers::registry::DeviceKind::Block,
                Box::new(drive),
            );
        }
    }
}
