//! Architecture support. Only x86_64 is implemented.

pub mod x86_64;

pub use x86_64::*;
