//! x86_64 architecture support.
//!
//! Provides hardware initialization (GDT, IDT, PIC), interrupt control,
//! serial I/O (COM1 at 0x3F8), VGA text output, and I/O port primitives
//! for the x86_64 platform.

#![allow(clippy::missing_safety_doc)]

pub mod context;
pub mod gdt;
pub mod idt;
pub mod timer;
pub mod vga;

/// IRQ0 (timer) and IRQ1 (keyboard) are remapped to interrupt vectors 32
/// and 33 respectively, clear of the CPU exception range.
pub const PIC_1_OFFSET: u8 = 32;
pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

static PICS: spin::Mutex<pic8259::ChainedPics> =
    spin::Mutex::new(unsafe { pic8259::ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Bring up the GDT, IDT, and 8259 PIC. Interrupts remain disabled on
/// return; the caller enables them once every subsystem that can receive
/// one (scheduler, keyboard) is ready.
pub fn init() {
    interrupts::disable();

    log::info!("arch: loading GDT");
    gdt::init();

    log::info!("arch: loading IDT");
    idt::init();

    log::info!("arch: remapping 8259 PIC to vectors {PIC_1_OFFSET}..{}", PIC_1_OFFSET + 16);
    // SAFETY: offsets are clear of the exception range and this runs once,
    // before interrupts are enabled.
    unsafe { PICS.lock().initialize() };
}

/// Unmask IRQ0 (timer) and IRQ1 (keyboard), then enable interrupts.
pub fn enable_irqs() {
    // SAFETY: masks are plain 8-bit IMR writes; see `ChainedPics::write_masks`.
    unsafe { PICS.lock().write_masks(0b1111_1100, 0b1111_1111) };
    interrupts::enable();
}

/// Acknowledge an interrupt at `vector`, letting the PIC deliver the next one.
pub fn end_of_interrupt(vector: u8) {
    // SAFETY: called only from within this vector's own handler.
    unsafe { PICS.lock().notify_end_of_interrupt(vector) };
}

/// Halt the CPU with interrupts off. Used by panic/shutdown paths.
#[allow(dead_code)]
pub fn halt() -> ! {
    x86_64::instructions::interrupts::disable();
    loop {
        x86_64::instructions::hlt();
    }
}

/// Halt until the next interrupt. Used by the idle thread.
pub fn idle() {
    x86_64::instructions::hlt();
}

pub fn serial_init() -> uart_16550::SerialPort {
    // SAFETY: SerialPort::new(0x3F8) creates a serial port handle for COM1
    // at the standard I/O base address. The address is well-known and the
    // port is initialized immediately after construction.
    let mut serial_port = unsafe { uart_16550::SerialPort::new(0x3F8) };
    serial_port.init();
    serial_port
}

/// Basic I/O port functions -- used by PCI, console, and storage drivers.
#[allow(dead_code)]
pub unsafe fn outb(port: u16, value: u8) {
    x86_64::instructions::port::Port::new(port).write(value);
}

#[allow(dead_code)]
pub unsafe fn inb(port: u16) -> u8 {
    x86_64::instructions::port::Port::new(port).read()
}

#[allow(dead_code)]
pub unsafe fn outw(port: u16, value: u16) {
    x86_64::instructions::port::Port::new(port).write(value);
}

#[allow(dead_code)]
pub unsafe fn inw(port: u16) -> u16 {
    x86_64::instructions::port::Port::new(port).read()
}

#[allow(dead_code)]
pub unsafe fn outl(port: u16, value: u32) {
    x86_64::instructions::port::Port::new(port).write(value);
}

#[allow(dead_code)]
pub unsafe fn inl(port: u16) -> u32 {
    x86_64::instructions::port::Port::new(port).read()
}

/// Kernel heap start address (mapped by the bootloader).
pub const HEAP_START: usize = 0x4444_4444_0000;

mod interrupts {
    pub fn enable() {
        x86_64::instructions::interrupts::enable();
    }

    pub fn disable() {
        x86_64::instructions::interrupts::disable();
    }
}
