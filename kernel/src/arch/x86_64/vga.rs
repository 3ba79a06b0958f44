//! VGA text-mode buffer.
//!
//! Low-level cell access only; [`crate::drivers::console`] wraps this in
//! the atomic-region-protected operation table the rest of the kernel
//! actually calls.

use core::ptr::write_volatile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(dead_code)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
struct ColorCode(u8);

impl ColorCode {
    fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode(((background as u8) << 4) | (foreground as u8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
struct ScreenChar {
    ascii_character: u8,
    color_code: ColorCode,
}

pub const BUFFER_HEIGHT: usize = 25;
pub const BUFFER_WIDTH: usize = 80;

const VGA_BUFFER_ADDR: usize = 0xb8000;

#[repr(transparent)]
struct Buffer {
    chars: [[ScreenChar; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

/// Direct, unsynchronized access to the VGA text buffer. Exactly one
/// instance exists (created once by `console::init`); all synchronization
/// is the caller's responsibility, matching the rest of this kernel's
/// "callers already hold the atomic region" convention.
pub struct RawBuffer {
    buffer: &'static mut Buffer,
    color_code: ColorCode,
}

impl RawBuffer {
    /// # Safety
    ///
    /// Must be called at most once; the VGA buffer is a singleton physical
    /// resource.
    pub unsafe fn new() -> Self {
        Self {
            // SAFETY: 0xb8000 is the well-known physical address of the VGA
            // text buffer, identity-mapped by the bootloader.
            buffer: unsafe { &mut *(VGA_BUFFER_ADDR as *mut Buffer) },
            color_code: ColorCode::new(Color::White, Color::Black),
        }
    }

    pub fn put_at(&mut self, row: usize, col: usize, byte: u8) {
        let ch = match byte {
            0x20..=0x7e | b'\n' => byte,
            _ => 0xfe,
        };
        let color_code = self.color_code;
        // SAFETY: row/col bounds are the caller's responsibility (console.rs
        // clamps both to the buffer dimensions before calling).
        unsafe {
            write_volatile(
                &mut self.buffer.chars[row][col],
                ScreenChar {
                    ascii_character: ch,
                    color_code,
                },
            );
        }
    }

    pub fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: self.color_code,
        };
        for col in 0..BUFFER_WIDTH {
            // SAFETY: row supplied by console.rs, always < BUFFER_HEIGHT.
            unsafe { write_volatile(&mut self.buffer.chars[row][col], blank) };
        }
    }

    /// Shift every row up by one, dropping row 0, and blank the new last row.
    pub fn scroll_up(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                // SAFETY: indices are within the fixed buffer dimensions.
                let ch = unsafe { core::ptr::read_volatile(&self.buffer.chars[row][col]) };
                unsafe { write_volatile(&mut self.buffer.chars[row - 1][col], ch) };
            }
        }
        self.clear_row(BUFFER_HEIGHT - 1);
    }
}
