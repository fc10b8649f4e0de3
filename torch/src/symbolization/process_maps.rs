//! Memory mapping utilities for process address space analysis
//!
//! This module parses /proc/pid/maps into an [`AddressMap`] of the
//! executable, file-backed mappings of a process. Each entry remembers the
//! file offset it was mapped from, which is what lets the symbolicator turn a
//! runtime address into a file-relative one for position-independent code.

use log::{debug, info};
use std::fs;

use super::address_map::AddressMap;
use crate::domain::{LoadError, Pid};

/// Read /proc/pid/maps and keep only executable file mappings
///
/// # Errors
/// Returns an error if /proc/pid/maps cannot be read (the process does not
/// exist, or we lack the privilege to inspect it)
pub fn load(pid: Pid) -> Result<AddressMap, LoadError> {
    let maps_path = pid.maps_path();
    let maps = fs::read_to_string(&maps_path).map_err(|source| LoadError::ProcessMaps { pid, source })?;

    let map = parse(&maps);
    info!("Loaded {} executable mappings from {maps_path}", map.len());
    Ok(map)
}

/// Parse the text of a mapping listing
///
/// Lines look like `start-end perms offset dev inode [path]`. Lines without a
/// path, with a `[pseudo]` path, without `x` in their permissions, or that
/// fail to parse are skipped. Surviving mappings keep their relative order.
#[must_use]
pub fn parse(text: &str) -> AddressMap {
    let mut map = AddressMap::new();

    for line in text.lines() {
        if let Some(mapping) = parse_line(line) {
            map.add_mapping(mapping.path, mapping.start, mapping.end - mapping.start, mapping.offset);
        } else if !line.trim().is_empty() {
            debug!("Skipping mapping: {line}");
        }
    }

    map
}

struct MapLine<'a> {
    start: u64,
    end: u64,
    offset: u64,
    path: &'a str,
}

fn parse_line(line: &str) -> Option<MapLine<'_>> {
    // Format: 7f45c000-7f45e000 r-xp 00000000 08:01 123456 /path/to/file
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?;
    let offset = fields.next()?;
    let _device = fields.next()?;
    let inode = fields.next()?;

    let path = path_field(line, inode)?;
    if path.starts_with('[') || !perms.contains('x') {
        return None;
    }

    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    if end <= start {
        return None;
    }
    let offset = u64::from_str_radix(offset, 16).ok()?;

    Some(MapLine { start, end, offset, path })
}

/// Everything after the inode field, so paths containing spaces stay whole
fn path_field<'a>(line: &'a str, inode: &str) -> Option<&'a str> {
    let mut rest = line.trim_start();
    for _ in 0..4 {
        rest = rest.split_once(char::is_whitespace)?.1.trim_start();
    }
    let path = rest.strip_prefix(inode)?.trim();
    if path.is_empty() {
        None
    } else {
        Some(path)
    }
}
