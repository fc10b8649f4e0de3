//! # Native Symbol Resolution
//!
//! This module turns raw instruction pointers sampled from a running process
//! into function names, using nothing but the process's mapping table and the
//! ELF symbol tables of the binaries it has mapped.
//!
//! ## Three coordinate spaces
//!
//! ```text
//! process address   0x55f3a2b4c6a4      where the CPU was
//!        │  - mapping.base + mapping.mapped_entity_offset
//!        ▼
//! file offset       0x6a4               where the bytes live in the ELF file
//!        │  + symbol.load_base (section address rounded to its alignment)
//!        ▼
//! symbol address    0x4006a4            what st_value says
//! ```
//!
//! 1. [`process_maps`] parses `/proc/<pid>/maps`, keeping only executable,
//!    file-backed mappings, each with the file offset it was mapped from.
//! 2. [`symbol_table`] walks `.dynsym` and `.symtab` of every mapped binary and
//!    records each symbol's `[value, value + size]` range together with its
//!    section load base.
//! 3. [`Symbolicator::atos`] chains the two lookups.
//!
//! Both lookups go through [`AddressMap`], an insertion-ordered list with
//! inclusive ranges where the first enclosing entry wins.
//!
//! ## Example
//!
//! ```rust,ignore
//! let symbolicator = Symbolicator::load_for_pid(Pid(1234), DEFAULT_MAX_CONCURRENT_LOADS).await?;
//! println!("{}", symbolicator.atos(0x55f3_a2b4_c6a4)); // "main"
//! println!("{}", symbolicator.atos(0x10));             // "[0x10 in unknown binary]"
//! ```
//!
//! ## Limitations
//!
//! - **ELF64 only**: symbol records are decoded with the 24-byte `Elf64_Sym` layout
//! - **No DWARF**: results are function names, without file or line
//! - **Stripped binaries**: resolve to `[0x... in /path/to/binary]`

pub mod address_map;
pub mod demangle;
pub mod process_maps;
pub mod symbol_table;
pub mod symbolicator;

pub use address_map::{AddressMap, Entry};
pub use demangle::demangle;
pub use symbolicator::{Symbolicator, DEFAULT_MAX_CONCURRENT_LOADS};
