//! Block-device request pipeline (§4.G).
//!
//! A block device exposes four operations: post a request, block count,
//! block size, close. A request carries an LBA, block count, buffer, and
//! direction; the caller builds it, the device routes it (typically via
//! `sched::workqueue::schedule_work`), the driver performs the transfer,
//! then calls [`BlockRequest::notify_complete`], which inside an atomic
//! region sets the request `FINISHED`, stores the result code, and wakes
//! the request's embedded wait queue.
//!
//! `post_and_wait` posts a request then calls `wait_for_completion`, which
//! loops under an atomic region until the state becomes `FINISHED`.
//! Synchronous `read`/`write` helpers build a transient request on the
//! caller's stack, post-and-wait, and return. The buffer must stay valid
//! and untouched by the caller between post and completion -- it is only
//! safe here because `post_and_wait` blocks the calling thread until the
//! driver is done with it.

use core::cell::UnsafeCell;
use core::ptr::NonNull;

use alloc::string::String;
use alloc::vec::Vec;

use crate::error::KernelError;
use crate::sched::wait_queue::WaitQueue;
use crate::sync::atomic::atomic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Pending,
    Finished,
}

/// A single block-device transfer in flight. Built on the caller's stack
/// by [`BlockDevice::read`]/`write`/`post_and_wait`, never heap-allocated,
/// since its lifetime never outlives the posting thread's wait.
pub struct BlockRequest {
    pub lba: u64,
    pub count: u32,
    buffer: NonNull<u8>,
    buffer_len: usize,
    pub direction: Direction,
    state: UnsafeCell<RequestState>,
    result: UnsafeCell<Result<(), KernelError>>,
    waiters: UnsafeCell<WaitQueue>,
}

// SAFETY: every field is only touched from within an interrupt-atomic
// region (state/result/waiters) or is plain data (lba/count/direction);
// the buffer pointer is dereferenced only by the driver during the
// transfer and by the poster after `wait_for_completion` returns, which
// can't overlap.
unsafe impl Send for BlockRequest {}
unsafe impl Sync for BlockRequest {}

impl BlockRequest {
    pub fn new(lba: u64, count: u32, buffer: &mut [u8], direction: Direction) -> Self {
        Self {
            lba,
            count,
            // SAFETY: `buffer` is a valid, non-null slice borrow for the
            // lifetime of this `BlockRequest`.
            buffer: unsafe { NonNull::new_unchecked(buffer.as_mut_ptr()) },
            buffer_len: buffer.len(),
            direction,
            state: UnsafeCell::new(RequestState::Pending),
            result: UnsafeCell::new(Ok(())),
            waiters: UnsafeCell::new(WaitQueue::new()),
        }
    }

    /// The request's data buffer. Only the driver servicing this request
    /// may call this before [`Self::notify_complete`].
    pub fn buffer(&self) -> &mut [u8] {
        // SAFETY: see the `Send`/`Sync` justification above.
        unsafe { core::slice::from_raw_parts_mut(self.buffer.as_ptr(), self.buffer_len) }
    }

    /// Called by the driver once the transfer is done. Wakes the poster.
    pub fn notify_complete(&self, rc: Result<(), KernelError>) {
        atomic(|| {
            // SAFETY: confined to this atomic region.
            unsafe {
                *self.result.get() = rc;
                *self.state.get() = RequestState::Finished;
                (*self.waiters.get()).wakeup_all();
            }
        });
    }

    /// Block until the request reaches `FINISHED`, then return its result.
    pub fn wait_for_completion(&self) -> Result<(), KernelError> {
        loop {
            let done = atomic(|| {
                // SAFETY: confined to this atomic region.
                unsafe {
                    if *self.state.get() == RequestState::Finished {
                        Some(*self.result.get())
                    } else {
                        crate::sched::scheduler::wait(&mut *self.waiters.get());
                        None
                    }
                }
            });
            if let Some(result) = done {
                return result;
            }
        }
    }
}

pub trait BlockDevice: Send + Sync {
    fn name(&self) -> &str;
    fn block_size(&self) -> usize;
    fn block_count(&self) -> u64;

    /// Route `req` to the driver. Implementations typically hand the
    /// request to `sched::workqueue::schedule_work` and return
    /// immediately; `req` stays alive until `notify_complete` runs because
    /// the poster blocks on it in the meantime.
    fn post(&self, req: &BlockRequest);

    fn close(&self) {}

    /// Post `req` and block until it completes.
    fn post_and_wait(&self, req: &BlockRequest) -> Result<(), KernelError> {
        self.post(req);
        req.wait_for_completion()
    }

    /// Synchronous read built from a transient request.
    fn read(&self, lba: u64, buffer: &mut [u8]) -> Result<(), KernelError> {
        let count = (buffer.len() / self.block_size()) as u32;
        let req = BlockRequest::new(lba, count, buffer, Direction::Read);
        self.post_and_wait(&req)
    }

    /// Synchronous write built from a transient request.
    fn write(&self, lba: u64, buffer: &mut [u8]) -> Result<(), KernelError> {
        let count = (buffer.len() / self.block_size()) as u32;
        let req = BlockRequest::new(lba, count, buffer, Direction::Write);
        self.post_and_wait(&req)
    }
}

/// RAM-backed block device: services requests synchronously on the
/// posting thread's call to `post`, used for tests and as a pfat-less
/// root until a real disk is registered.
pub struct RamBlockDevice {
    name: String,
    block_size: usize,
    data: crate::sync::Mutex<Vec<u8>>,
}

impl RamBlockDevice {
    pub fn new(name: String, block_size: usize, block_count: u64) -> Self {
        Self {
            name,
            block_size,
            data: crate::sync::Mutex::new(alloc::vec![0u8; block_size * block_count as usize]),
        }
    }
}

impl BlockDevice for RamBlockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn block_count(&self) -> u64 {
        (self.data.lock().len() / self.block_size) as u64
    }

    fn post(&self, req: &BlockRequest) {
        let start = req.lba as usize * self.block_size;
        let end = start + req.buffer().len();
        let mut data = self.data.lock();
        let rc = if end > data.len() {
            Err(KernelError::Inval { detail: "block range out of bounds" })
        } else {
            match req.direction {
                Direction::Read => {
                    req.buffer().copy_from_slice(&data[start..end]);
                    Ok(())
                }
                Direction::Write => {
                    data[start..end].copy_from_slice(req.buffer());
                    Ok(())
                }
            }
        };
        drop(data);
        req.notify_complete(rc);
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;

    use super::*;

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn ram_block_device_round_trips() {
        let dev = RamBlockDevice::new(String::from("test"), 512, 100);
        assert_eq!(dev.block_size(), 512);
        assert_eq!(dev.block_count(), 100);

        let mut write_buf = [0x42u8; 512];
        dev.write(0, &mut write_buf).unwrap();

        let mut read_buf = [0u8; 512];
        dev.read(0, &mut read_buf).unwrap();
        assert_eq!(read_buf, write_buf);
    }

    #[cfg_attr(target_os = "none", test_case)]
    #[cfg_attr(not(target_os = "none"), test)]
    fn out_of_bounds_read_fails() {
        let dev = RamBlockDevice::new(String::from("test"), 512, 4);
        let mut buf = [0u8; 512];
        assert!(dev.read(10, &mut buf).is_err());
    }
}
