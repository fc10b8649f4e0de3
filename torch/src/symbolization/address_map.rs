//! Interval lookup over named address ranges
//!
//! One [`AddressMap`] answers "which binary is mapped at this process
//! address", another per binary answers "which symbol covers this file
//! address". Both are plain insertion-ordered lists: lookups scan linearly and
//! the first enclosing entry wins, even when a later entry would be a tighter
//! match.

use std::io::{self, Write};

/// A named, inclusive address range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// File path (process maps) or demangled symbol name (symbol tables)
    pub name: String,
    pub base: u64,
    pub length: u64,
    /// Where in the underlying file this range's content begins
    pub mapped_entity_offset: u64,
    /// Bias added to a query address before comparing against `base`
    pub load_base: u64,
}

impl Entry {
    /// Last address covered by this entry (inclusive)
    #[must_use]
    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.length)
    }

    /// Check whether `address`, shifted by this entry's load base, falls in
    /// `[base, base + length]`
    #[must_use]
    pub fn encloses(&self, address: u64) -> bool {
        match address.checked_add(self.load_base) {
            Some(scoped) => scoped >= self.base && scoped <= self.end(),
            None => false,
        }
    }

    /// Same as [`Entry::encloses`] but against the file-offset range
    #[must_use]
    pub fn encloses_file_offset(&self, offset: u64) -> bool {
        offset >= self.mapped_entity_offset
            && offset <= self.mapped_entity_offset.saturating_add(self.length)
    }
}

/// Ordered collection of [`Entry`] values with first-match interval lookup
#[derive(Debug, Clone, Default)]
pub struct AddressMap {
    entries: Vec<Entry>,
}

impl AddressMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Overlaps and ordering are not checked.
    pub fn add_entry(
        &mut self,
        name: impl Into<String>,
        base: u64,
        length: u64,
        mapped_entity_offset: u64,
        load_base: u64,
    ) {
        self.entries.push(Entry {
            name: name.into(),
            base,
            length,
            mapped_entity_offset,
            load_base,
        });
    }

    /// Append an entry with no load base correction
    pub fn add_mapping(
        &mut self,
        name: impl Into<String>,
        base: u64,
        length: u64,
        mapped_entity_offset: u64,
    ) {
        self.add_entry(name, base, length, mapped_entity_offset, 0);
    }

    /// First entry, in insertion order, whose range encloses
    /// `address + entry.load_base`
    #[must_use]
    pub fn entry_for_offset(&self, address: u64) -> Option<&Entry> {
        self.entries.iter().find(|e| e.encloses(address))
    }

    /// First entry whose backing file range encloses `offset`
    ///
    /// Only meaningful when every entry is mapped from the same file.
    #[must_use]
    pub fn entry_for_file_offset(&self, offset: u64) -> Option<&Entry> {
        self.entries.iter().find(|e| e.encloses_file_offset(offset))
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct entry names in first-seen order
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !names.contains(&entry.name.as_str()) {
                names.push(&entry.name);
            }
        }
        names
    }

    /// Sort entries by base address and write one `start-end: name` line each
    ///
    /// The sort is in place, so insertion order is gone after this call.
    ///
    /// # Errors
    /// Returns an error if writing to `out` fails
    pub fn print<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.entries.sort_by_key(|e| e.base);
        for entry in &self.entries {
            writeln!(out, "{:x}-{:x}: {}", entry.base, entry.end(), entry.name)?;
        }
        Ok(())
    }
}
