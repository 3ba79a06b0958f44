//! Console `printf`.
//!
//! The console is architecture-polymorphic over a small operation table
//! (`clear`, `numrows`, `numcols`, `getx`/`gety`, `movecurs`, `putchar`,
//! `write`, `cleartoeol`); on this kernel the only backend is the VGA text
//! buffer, but callers go through [`ConsoleOps`] rather than touching
//! [`crate::arch::x86_64::vga`] directly. The whole of a `print!`/`println!`
//! call runs inside one atomic region, so output from two threads (or a
//! thread and an interrupt handler) interleaves at message boundaries at
//! worst -- panics and assertions depend on that.

use core::fmt;

use crate::arch::x86_64::vga::{RawBuffer, BUFFER_HEIGHT, BUFFER_WIDTH};
use crate::sync::atomic::atomic;

/// The architecture-polymorphic operation set a console backend provides.
pub trait ConsoleOps {
    fn clear(&mut self);
    fn numrows(&self) -> usize;
    fn numcols(&self) -> usize;
    fn getx(&self) -> usize;
    fn gety(&self) -> usize;
    fn movecurs(&mut self, x: usize, y: usize);
    fn putchar(&mut self, c: u8);
    fn write(&mut self, s: &str);
    fn cleartoeol(&mut self);
}

struct VgaConsole {
    raw: RawBuffer,
    col: usize,
    row: usize,
}

impl ConsoleOps for VgaConsole {
    fn clear(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.raw.clear_row(row);
        }
        self.col = 0;
        self.row = 0;
    }

    fn numrows(&self) -> usize {
        BUFFER_HEIGHT
    }

    fn numcols(&self) -> usize {
        BUFFER_WIDTH
    }

    fn getx(&self) -> usize {
        self.col
    }

    fn gety(&self) -> usize {
        self.row
    }

    fn movecurs(&mut self, x: usize, y: usize) {
        self.col = x.min(BUFFER_WIDTH - 1);
        self.row = y.min(BUFFER_HEIGHT - 1);
    }

    fn putchar(&mut self, c: u8) {
        if c == b'\n' {
            self.newline();
            return;
        }
        if self.col >= BUFFER_WIDTH {
            self.newline();
        }
        self.raw.put_at(self.row, self.col, c);
        self.col += 1;
    }

    fn write(&mut self, s: &str) {
        for byte in s.bytes() {
            self.putchar(byte);
        }
    }

    fn cleartoeol(&mut self) {
        for col in self.col..BUFFER_WIDTH {
            self.raw.put_at(self.row, col, b' ');
        }
    }
}

impl VgaConsole {
    fn newline(&mut self) {
        self.col = 0;
        if self.row + 1 < BUFFER_HEIGHT {
            self.row += 1;
        } else {
            self.raw.scroll_up();
        }
    }
}

static mut CONSOLE: Option<VgaConsole> = None;

/// Bring up the console backend. Must run before the first `print!`.
///
/// # Safety
///
/// Must be called exactly once, before any other console entry point, and
/// single-threaded (no other core or interrupt touching the console yet).
pub unsafe fn init() {
    // SAFETY: caller's single-call, single-threaded precondition; `RawBuffer::new`
    // carries the same precondition transitively.
    unsafe {
        CONSOLE = Some(VgaConsole {
            raw: RawBuffer::new(),
            col: 0,
            row: 0,
        });
    }
}

fn with_console<R>(f: impl FnOnce(&mut dyn ConsoleOps) -> R) -> R {
    atomic(|| {
        // SAFETY: `CONSOLE` is written once by `init` before interrupts are
        // enabled and never reassigned; this atomic region excludes any
        // other concurrent access.
        let console = unsafe {
            (&mut *core::ptr::addr_of_mut!(CONSOLE))
                .as_mut()
                .expect("console used before init")
        };
        f(console)
    })
}

pub fn clear() {
    with_console(|c| c.clear());
}

struct Writer;

impl fmt::Write for Writer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        with_console(|c| c.write(s));
        Ok(())
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    // The `with_console` calls `write_str` performs are individually
    // atomic, but a multi-call `write_fmt` (e.g. formatting a struct with
    // several field writes) must not be interleaved by another thread's
    // printf -- so the whole formatting pass runs in one outer region.
    atomic(|| {
        Writer.write_fmt(args).expect("console write_fmt failed");
    });
}
