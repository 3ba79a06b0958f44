//! Kernel version banner, printed once at boot.

pub struct VersionInfo {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
    pub git_hash: &'static str,
}

pub fn get_version_info() -> VersionInfo {
    VersionInfo {
        major: env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0),
        minor: env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0),
        patch: env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0),
        git_hash: env!("GIT_HASH", "0000000000000000000000000000000000000000"),
    }
}
