//! # torch - Symbolication for Sampling Profilers
//!
//! torch turns the raw frames a stack sampler captures from a running process
//! into readable names. Native frames are resolved through the ELF symbol
//! tables of the binaries the process has mapped; JIT-compiled JavaScript
//! frames are resolved by walking the runtime's heap objects through
//! `/proc/<pid>/mem`.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                     Target process (PID)                      │
//! └──────┬──────────────────────┬─────────────────────────┬───────┘
//!        │ /proc/<pid>/maps     │ mapped ELF files        │ /proc/<pid>/mem
//!        ▼                      ▼                         ▼
//! ┌──────────────┐      ┌──────────────┐      ┌──────────────────┐
//! │ process_maps │      │ symbol_table │      │ HeapMemoryReader │
//! └──────┬───────┘      └──────┬───────┘      └────────┬─────────┘
//!        │  AddressMap         │  AddressMap per binary   │
//!        └──────────┬──────────┘                          │
//!                   ▼                                     ▼
//!            ┌──────────────┐                     "name:file:line"
//!            │ Symbolicator │──► atos(addr) -> "symbol"
//!            └──────────────┘
//!                   │
//!                   ▼
//!            ┌──────────────┐
//!            │   analysis   │──► call tree / dtrace text
//!            └──────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`symbolization`]: native address resolution
//!   - `address_map`: first-match interval lookup shared by both maps
//!   - `process_maps`: executable file mappings out of `/proc/<pid>/maps`
//!   - `symbol_table`: `.dynsym` and `.symtab` of an ELF64 file
//!   - `symbolicator`: concurrent loading and the `atos` lookup
//!
//! - [`heap`]: JavaScript function decoding through the runtime's heap
//!
//! - [`analysis`]: raw stack parsing, call tree aggregation, dtrace text export
//!
//! - [`domain`]: core types (`Pid`, `Address`) and errors
//!
//! - [`cli`], [`preflight`], [`process_lookup`]: the `torch` binary's front end
//!
//! ## Typical Usage
//!
//! ```bash
//! # Resolve two sampled instruction pointers
//! torch atos node 0x55f3a2b4c6a4 0x7f1c2a3b4c5d
//!
//! # Decode a JSFunction found on the stack
//! sudo torch heap 1234 0x3a2f1c0d4e81
//!
//! # Fold sampler output into a call tree
//! torch aggregate stacks.txt --reverse
//! ```
//!
//! ## Key Concepts
//!
//! - **Mapped entity offset**: file offset a mapping was created from
//! - **Load base**: a section's address rounded down to its alignment; added to
//!   file offsets to reach symbol value space
//! - **Tagged pointer / SMI**: heap words either point to objects (low bit set)
//!   or hold a small integer in their upper 32 bits
//! - **Cons string**: a heap string stored as the concatenation of two others

pub mod analysis;
pub mod cli;
pub mod domain;
pub mod heap;
pub mod preflight;
pub mod process_lookup;
pub mod symbolization;
