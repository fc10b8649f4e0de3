//! Post-processing of sampled stacks
//!
//! Turns the raw text a stack sampler emits into stacks, then either folds
//! them into a [`CallTree`] or re-emits them for flame graph tooling.

pub mod call_tree;
pub mod stacks;

pub use call_tree::{CallTree, StackNode};
pub use stacks::{parse_raw_stacks, truncate_frame_path, write_dtrace_text, Stack};
