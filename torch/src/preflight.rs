//! Pre-flight checks for torch
//!
//! Validates that a target process can be inspected before any map or symbol
//! table is loaded, so that failures surface as one actionable message
//! instead of an I/O error deep inside a load.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use log::warn;
use std::fs::File;
use std::path::Path;

use crate::domain::Pid;
use crate::heap::{HeapLayout, HeapMemoryReader};

/// Checks shared by every subcommand that inspects a live process
///
/// # Errors
/// Returns an error if the process is gone or its maps are unreadable
pub fn run_preflight_checks(pid: Pid) -> Result<()> {
    check_process_exists(pid)?;
    check_proc_access(pid)?;
    Ok(())
}

/// Open another process's heap for reading
///
/// Reading `/proc/<pid>/mem` needs ptrace access to the target, which in
/// practice means root. Not being root is only a warning: the same user with
/// a permissive `ptrace_scope` can still read it.
///
/// # Errors
/// Returns an error if the memory file cannot be opened
pub fn open_heap_reader(pid: Pid, layout: HeapLayout) -> Result<HeapMemoryReader<File>> {
    if !is_root() {
        warn!("Not running as root, reading the heap of {pid} will probably fail");
    }

    HeapMemoryReader::open_with_layout(pid, layout).with_context(|| {
        format!(
            "Cannot open {}\n\n\
             Reading another process's memory requires root or ptrace access.\n\
             Run with: sudo torch heap ...",
            pid.mem_path()
        )
    })
}

#[must_use]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Check if the target process exists
///
/// # Errors
/// Returns an error if `/proc/<pid>` is missing
pub fn check_process_exists(pid: Pid) -> Result<()> {
    let proc_path = format!("/proc/{}", pid.0);
    if !Path::new(&proc_path).exists() {
        bail!(
            "Process {} not found.\n\n\
             Is the process still running? Check with: ps -p {}",
            pid.0,
            pid.0
        );
    }
    Ok(())
}

/// Check if we can read the process's memory maps
///
/// # Errors
/// Returns an error if `/proc/<pid>/maps` cannot be read
pub fn check_proc_access(pid: Pid) -> Result<()> {
    let maps_path = pid.maps_path();
    std::fs::read_to_string(&maps_path).with_context(|| {
        format!(
            "Cannot read {maps_path}\n\n\
             This usually means:\n\
             - The process exited (check: ps -p {})\n\
             - Permission denied (run with sudo)\n\
             - /proc is not mounted",
            pid.0
        )
    })?;
    Ok(())
}
