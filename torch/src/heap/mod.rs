//! # JavaScript Frame Decoding
//!
//! JIT-compiled JavaScript frames have no ELF symbols. What they do have is a
//! `JSFunction` pointer on the stack, and the function's name, script and
//! source position are all reachable from it through the runtime's heap:
//!
//! ```text
//! JSFunction ──► SharedFunctionInfo ──┬──► name / inferred name   (String)
//!                                     ├──► start position         (packed u32)
//!                                     └──► Script ──┬──► name     (String)
//!                                                   ├──► line offset (SMI)
//!                                                   └──► line ends   (FixedArray of SMI)
//! ```
//!
//! [`HeapMemoryReader`] walks that graph through any [`MemorySource`], usually
//! `/proc/<pid>/mem`, with field offsets taken from a [`HeapLayout`].
//!
//! Heap values are tagged: pointers have the low bit set and small integers
//! live in the upper 32 bits of a word.

pub mod layout;
pub mod reader;
pub mod source;

pub use layout::HeapLayout;
pub use reader::{HeapMemoryReader, DEFAULT_MAX_CONS_DEPTH};
pub use source::MemorySource;
