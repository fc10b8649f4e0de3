//! ELF symbol table loading
//!
//! Builds an [`AddressMap`] of `symbol name -> [value, value + size]` from the
//! `.dynsym`/`.dynstr` and `.symtab`/`.strtab` section pairs of an ELF64
//! image. The `object` crate parses the container (file header and section
//! headers); the symbol records themselves are decoded here from their fixed
//! 24-byte layout.
//!
//! ## Load base
//!
//! Symbol values are link-time virtual addresses (`0x4006a4` for `main` in a
//! non-PIE executable), while the symbolicator queries with file-relative
//! offsets (`0x6a4`). Each entry therefore carries the load base of its
//! section, `sh_addr` rounded down to `sh_addralign`, which the address map
//! adds back to the query before comparing.

use log::debug;
use object::elf::FileHeader64;
use object::read::elf::{FileHeader, SectionHeader};
use object::Endianness;
use std::borrow::Cow;
use std::fs;
use std::path::Path;

use super::address_map::AddressMap;
use super::demangle::demangle;
use crate::domain::LoadError;

/// Symbol/string section pairs, in load order
const SYMBOL_TABLES: [(&str, &str); 2] = [(".dynsym", ".dynstr"), (".symtab", ".strtab")];

/// `sizeof(Elf64_Sym)`
const SYMBOL_SIZE: usize = 24;

/// Longest symbol name read out of a string table, terminator included
const MAX_NAME_LEN: usize = 500;

const UNKNOWN_NAME: &str = "<unknown>";

/// Read and parse the symbol tables of the ELF file at `path`
///
/// # Errors
/// Returns an error if the file cannot be read or is not a well-formed ELF64
/// image. A stripped binary is not an error; its map is simply empty.
pub fn load(path: impl AsRef<Path>) -> Result<AddressMap, LoadError> {
    let path = path.as_ref();
    let data = fs::read(path)
        .map_err(|source| LoadError::ReadBinary { path: path.to_path_buf(), source })?;

    let map = parse(&data)
        .map_err(|source| LoadError::ParseBinary { path: path.to_path_buf(), source })?;

    debug!("Loaded {} symbols from {}", map.len(), path.display());
    Ok(map)
}

/// Parse the symbol tables of an in-memory ELF64 image
///
/// # Errors
/// Returns an error if the file header or section header table is malformed
pub fn parse(data: &[u8]) -> object::read::Result<AddressMap> {
    let header = FileHeader64::<Endianness>::parse(data)?;
    let endian = header.endian()?;
    let table = header.sections(endian, data)?;

    let sections = table
        .iter()
        .map(|section| {
            Ok::<_, object::read::Error>(Section {
                name: table.section_name(endian, section)?,
                address: section.sh_addr(endian),
                align: section.sh_addralign(endian),
                data: section.data(endian, data)?,
            })
        })
        .collect::<object::read::Result<Vec<_>>>()?;

    let mut map = AddressMap::new();
    for (symbols, strings) in SYMBOL_TABLES {
        add_all(&sections, symbols, strings, &mut map);
    }

    Ok(map)
}

/// The parts of a section header the symbol walk needs
struct Section<'data> {
    name: &'data [u8],
    address: u64,
    align: u64,
    data: &'data [u8],
}

impl Section<'_> {
    /// Section address rounded down to its alignment
    fn load_base(&self) -> u64 {
        self.address & !self.align.wrapping_sub(1)
    }
}

/// One `Elf64_Sym` record: name(4) info(1) other(1) shndx(2) value(8) size(8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RawSymbol {
    name: u32,
    shndx: u16,
    value: u64,
    size: u64,
}

impl RawSymbol {
    fn decode(record: &[u8]) -> Option<Self> {
        Some(Self {
            name: u32::from_le_bytes(record.get(0..4)?.try_into().ok()?),
            shndx: u16::from_le_bytes(record.get(6..8)?.try_into().ok()?),
            value: u64::from_le_bytes(record.get(8..16)?.try_into().ok()?),
            size: u64::from_le_bytes(record.get(16..24)?.try_into().ok()?),
        })
    }
}

fn find_section<'a, 'data>(sections: &'a [Section<'data>], name: &str) -> Option<&'a Section<'data>> {
    sections.iter().find(|s| s.name == name.as_bytes())
}

fn add_all(sections: &[Section<'_>], symbols_name: &str, strings_name: &str, map: &mut AddressMap) {
    let (Some(symbols), Some(strings)) =
        (find_section(sections, symbols_name), find_section(sections, strings_name))
    else {
        debug!("No {symbols_name}/{strings_name} pair");
        return;
    };

    let before = map.len();

    // Skip over leading null entry
    for record in symbols.data.chunks_exact(SYMBOL_SIZE).skip(1) {
        let Some(symbol) = RawSymbol::decode(record) else {
            continue;
        };

        // 0 value means external reference
        if symbol.value == 0 {
            continue;
        }

        let Some(section) = sections.get(usize::from(symbol.shndx)) else {
            continue;
        };

        let name = symbol_name(strings.data, symbol.name);
        map.add_entry(demangle(&name), symbol.value, symbol.size, 0, section.load_base());
    }

    debug!("{symbols_name}: {} symbols", map.len() - before);
}

/// Copy a NUL-terminated name out of a string table
fn symbol_name(strings: &[u8], offset: u32) -> Cow<'_, str> {
    let Some(tail) = usize::try_from(offset).ok().and_then(|start| strings.get(start..)) else {
        return Cow::Borrowed(UNKNOWN_NAME);
    };

    let window = &tail[..tail.len().min(MAX_NAME_LEN)];
    match window.iter().position(|&b| b == 0) {
        Some(end) => String::from_utf8_lossy(&window[..end]),
        None => Cow::Borrowed(UNKNOWN_NAME),
    }
}
