//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep process IDs and raw addresses from being mixed
//! up with the many other integers that flow through symbolication.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Process ID
///
/// Represents a process ID in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl Pid {
    /// Path of this process's mapping listing
    #[must_use]
    pub fn maps_path(self) -> String {
        format!("/proc/{}/maps", self.0)
    }

    /// Path of this process's memory file
    #[must_use]
    pub fn mem_path(self) -> String {
        format!("/proc/{}/mem", self.0)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

impl From<u32> for Pid {
    fn from(pid: u32) -> Self {
        Pid(pid)
    }
}

/// A raw address as captured from a stack or typed on the command line
///
/// Parses from hex with or without a `0x` prefix, and displays as `0x...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub u64);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl FromStr for Address {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        u64::from_str_radix(digits, 16).map(Address)
    }
}
