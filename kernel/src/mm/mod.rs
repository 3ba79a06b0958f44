//! Physical memory management: frame allocator and kernel heap.

pub mod frame;
pub mod heap;
