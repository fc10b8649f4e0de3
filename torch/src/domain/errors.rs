//! Structured error types for torch
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::Pid;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to build one of the maps a `Symbolicator` is made of.
///
/// These are the only fatal errors in the engine: a resolver that cannot be
/// built. Misses during resolution are reported as strings instead.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read /proc/{}/maps: {source}", .pid.0)]
    ProcessMaps {
        pid: Pid,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read binary {}: {source}", .path.display())]
    ReadBinary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse ELF file {}: {source}", .path.display())]
    ParseBinary {
        path: PathBuf,
        #[source]
        source: object::read::Error,
    },

    #[error("Symbol table load task failed: {0}")]
    TaskFailed(String),
}

/// Failure decoding one field of a runtime heap object.
///
/// Never escapes `HeapMemoryReader::read_function`; each sub-read turns it
/// into a placeholder.
#[derive(Error, Debug)]
pub enum HeapError {
    #[error("Failed to read {len} bytes at 0x{addr:x}: {source}")]
    Read {
        addr: u64,
        len: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Object at 0x{addr:x} has type 0x{found:02x}, expected 0x{expected:02x}")]
    UnexpectedType { addr: u64, expected: u8, found: u8 },

    #[error("Position {position} not found in line ends of script 0x{script:x}")]
    NotFound { script: u64, position: u64 },

    #[error("Computed line number {0} is out of range")]
    NegativeLine(i64),
}
