//! Kernel error taxonomy.
//!
//! A small, closed set of error codes, mirroring the classic kernel
//! convention of small negative integers (`NOMEM`, `EXIST`, ...) but
//! expressed as a typed enum per Rust idiom instead of a bare `i32`.

use core::fmt;

/// Kernel-wide error type returned by fallible operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "kernel errors must be handled, not silently discarded"]
pub enum KernelError {
    /// Out of memory (frames or heap).
    NoMem,
    /// The named resource already exists.
    Exist { resource: &'static str },
    /// Expected a directory, found something else.
    NotDir,
    /// Bad argument.
    Inval { detail: &'static str },
    /// No such device.
    NoDev { name: &'static str },
    /// I/O error reported by a driver.
    Io,
    /// Operation/feature not supported.
    NotSup { operation: &'static str },
}

pub type KernelResult<T> = Result<T, KernelError>;

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMem => write!(f, "out of memory"),
            Self::Exist { resource } => write!(f, "already exists: {resource}"),
            Self::NotDir => write!(f, "not a directory"),
            Self::Inval { detail } => write!(f, "invalid argument: {detail}"),
            Self::NoDev { name } => write!(f, "no such device: {name}"),
            Self::Io => write!(f, "I/O error"),
            Self::NotSup { operation } => write!(f, "not supported: {operation}"),
        }
    }
}

/// Legacy negative-errno mapping, for anything that needs a raw code
/// (request completion codes, on-disk error reporting).
impl From<KernelError> for i32 {
    fn from(err: KernelError) -> i32 {
        match err {
            KernelError::NoMem => -1,
            KernelError::Exist { .. } => -2,
            KernelError::NotDir => -3,
            KernelError::Inval { .. } => -4,
            KernelError::NoDev { .. } => -5,
            KernelError::Io => -6,
            KernelError::NotSup { .. } => -7,
        }
    }
}

/// Build a [`KernelError`] with less ceremony at call sites.
#[macro_export]
macro_rules! kernel_error {
    (Exist { $resource:expr }) => {
        $crate::error::KernelError::Exist { resource: $resource }
    };
    (Inval { $detail:expr }) => {
        $crate::error::KernelError::Inval { detail: $detail }
    };
    (NoDev { $name:expr }) => {
        $crate::error::KernelError::NoDev { name: $name }
    };
    (NotSup { $operation:expr }) => {
        $crate::error::KernelError::NotSup { operation: $operation }
    };
    ($variant:ident) => {
        $crate::error::KernelError::$variant
    };
}

/// Fatal-invariant assertion. Unlike `KernelError`, violating one of these
/// is never recoverable and halts the kernel, matching GeekOS's `KASSERT`.
#[macro_export]
macro_rules! kernel_assert {
    ($cond:expr) => {
        if !$cond {
            panic!("assertion failed: {}", stringify!($cond));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            panic!($($arg)+);
        }
    };
}

#[macro_export]
macro_rules! kernel_assert_eq {
    ($left:expr, $right:expr) => {
        $crate::kernel_assert!($left == $right, "assertion failed: {:?} != {:?}", $left, $right);
    };
}
