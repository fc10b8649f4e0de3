//! Resolve the process a command targets, by PID or by name.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::Pid;

/// A process found under `/proc`
#[derive(Debug)]
pub struct ProcessInfo {
    pub pid: Pid,
    pub exe_path: PathBuf,
    pub command: String,
}

/// Resolve a `<PID|PROCESS>` argument
///
/// All-digit targets are taken as a PID without touching `/proc`; anything
/// else goes through [`find_process_by_name`].
///
/// # Errors
/// Returns an error if a name matches no process or more than one
pub fn resolve_target(target: &str) -> Result<Pid> {
    if let Ok(pid) = target.parse::<u32>() {
        return Ok(Pid(pid));
    }
    Ok(find_process_by_name(target)?.pid)
}

/// Find a process by name.
///
/// Matches against the command name from `/proc/<pid>/stat` and the basename
/// of `/proc/<pid>/exe`. Kernel threads, processes we cannot inspect and
/// torch itself are skipped.
///
/// # Errors
/// - No processes found
/// - Multiple processes found (ambiguous)
pub fn find_process_by_name(name: &str) -> Result<ProcessInfo> {
    let own_pid = std::process::id();
    let mut matches: Vec<ProcessInfo> = Vec::new();

    let proc_dir = fs::read_dir("/proc").context("Failed to read /proc")?;

    for entry in proc_dir.flatten() {
        let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() else {
            continue;
        };
        if pid == own_pid {
            continue;
        }

        let Ok(exe_path) = resolve_exe_path(Pid(pid)) else {
            continue;
        };
        let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
            continue;
        };
        let Ok(command) = extract_comm(&stat) else {
            continue;
        };

        if is_match(&command, &exe_path, name) {
            matches.push(ProcessInfo { pid: Pid(pid), exe_path, command });
        }
    }

    match matches.len() {
        0 => bail!(
            "No process matching '{name}' found.\n\
             Check running processes with: ps aux | grep {name}"
        ),
        1 => Ok(matches.remove(0)),
        _ => {
            let list: Vec<String> =
                matches.iter().map(|m| format!("  {} ({})", m.pid.0, m.command)).collect();
            bail!(
                "Multiple processes match '{name}':\n{}\n\n\
                 Pass the PID instead of the name.",
                list.join("\n")
            )
        }
    }
}

/// Resolve binary path from PID via `/proc/<pid>/exe`.
///
/// # Errors
/// Returns error if the process doesn't exist or the link is not readable.
pub fn resolve_exe_path(pid: Pid) -> Result<PathBuf> {
    let exe_link = format!("/proc/{}/exe", pid.0);
    fs::read_link(&exe_link).with_context(|| format!("Cannot read {exe_link}"))
}

/// Command name out of a `/proc/<pid>/stat` line: "pid (comm) state ..."
fn extract_comm(stat_line: &str) -> Result<String> {
    let open = stat_line.find('(').context("Invalid stat format")?;
    let close = stat_line.rfind(')').context("Invalid stat format")?;
    if open >= close {
        bail!("Invalid stat format");
    }
    Ok(stat_line[open + 1..close].to_string())
}

/// Exact match on command or exe basename, else substring match on either
fn is_match(command: &str, exe_path: &Path, pattern: &str) -> bool {
    let exe_basename = exe_path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let pattern_basename =
        Path::new(pattern).file_name().and_then(|n| n.to_str()).unwrap_or(pattern);

    command == pattern_basename
        || exe_basename == pattern_basename
        || command.contains(pattern)
        || exe_basename.contains(pattern)
}
