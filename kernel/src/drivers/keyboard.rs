//! Keyboard bridge (§4.L).
//!
//! A small fixed-size ring buffer filled by the keyboard IRQ (vector 33).
//! Each enqueue wakes one waiter on [`WAITERS`]. `wait_for_key` loops under
//! an atomic region: if the buffer is non-empty it dequeues and returns,
//! otherwise it blocks on the queue. Scancode-to-key decoding is delegated
//! to `pc_keyboard`; this module only owns the ring buffer and the
//! interrupt-to-thread handoff.

use pc_keyboard::{layouts, DecodedKey, HandleControl, Keyboard, ScancodeSet1};

use crate::sched::wait_queue::WaitQueue;
use crate::sync::atomic::atomic;

const RING_CAPACITY: usize = 128;

struct Ring {
    buf: [u8; RING_CAPACITY],
    head: usize,
    tail: usize,
    len: usize,
}

impl Ring {
    const fn new() -> Self {
        Self { buf: [0; RING_CAPACITY], head: 0, tail: 0, len: 0 }
    }

    fn push(&mut self, byte: u8) {
        if self.len == RING_CAPACITY {
            return;
        }
        self.buf[self.tail] = byte;
        self.tail = (self.tail + 1) % RING_CAPACITY;
        self.len += 1;
    }

    fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.buf[self.head];
        self.head = (self.head + 1) % RING_CAPACITY;
        self.len -= 1;
        Some(byte)
    }
}

struct KeyboardState {
    ring: Ring,
    decoder: Keyboard<layouts::Us104Key, ScancodeSet1>,
}

static mut STATE: Option<KeyboardState> = None;
static mut WAITERS: WaitQueue = WaitQueue::new();

/// # Safety
///
/// Must be called exactly once, before interrupts are enabled.
pub unsafe fn init() {
    // SAFETY: single-call, pre-IRQ precondition from the caller.
    unsafe {
        STATE = Some(KeyboardState {
            ring: Ring::new(),
            decoder: Keyboard::new(ScancodeSet1::new(), layouts::Us104Key, HandleControl::MapLettersToUnicode),
        });
    }
}

/// Called from the keyboard interrupt handler with interrupts already
/// disabled. Must not allocate or block.
pub fn on_scancode(scancode: u8) {
    atomic(|| {
        // SAFETY: `STATE`/`WAITERS` are only touched inside atomic regions,
        // either here or from `wait_for_key` below.
        let state = unsafe {
            match (&mut *core::ptr::addr_of_mut!(STATE)).as_mut() {
                Some(s) => s,
                None => return,
            }
        };
        if let Ok(Some(event)) = state.decoder.add_byte(scancode) {
            if let Some(DecodedKey::Unicode(ch)) = state.decoder.process_keyevent(event) {
                if ch.is_ascii() {
                    state.ring.push(ch as u8);
                    // SAFETY: same atomic region as the rest of this function.
                    unsafe { (&mut *core::ptr::addr_of_mut!(WAITERS)).wakeup_one() };
                }
            }
        }
    });
}

/// Block the calling thread until a key is available, then return it.
pub fn wait_for_key() -> u8 {
    loop {
        let got = atomic(|| {
            // SAFETY: only touched from within atomic regions.
            let state = unsafe {
                (&mut *core::ptr::addr_of_mut!(STATE)).as_mut().expect("keyboard used before init")
            };
            match state.ring.pop() {
                Some(byte) => Some(byte),
                None => {
                    // SAFETY: same as above.
                    unsafe { crate::sched::scheduler::wait(&mut *core::ptr::addr_of_mut!(WAITERS)) };
                    None
                }
            }
        });
        if let Some(byte) = got {
            return byte;
        }
    }
}
