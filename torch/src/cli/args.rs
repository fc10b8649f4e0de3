//! CLI argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::heap::DEFAULT_MAX_CONS_DEPTH;
use crate::symbolization::DEFAULT_MAX_CONCURRENT_LOADS;

#[derive(Parser)]
#[command(
    name = "torch",
    version,
    about = "Symbolicate native and JavaScript frames of a running process",
    after_help = "\
EXAMPLES:
    torch atos node 0x55f3a2b4c6a4            Resolve an address in the process named node
    torch maps 1234                           List executable mappings of PID 1234
    sudo torch heap 1234 0x3a2f1c0d4e81       Decode a JSFunction pointer
    torch aggregate stacks.txt --reverse      Fold leaf-first stacks into a call tree"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve native addresses to symbol names
    Atos {
        /// Process ID or name
        #[arg(value_name = "PID|PROCESS")]
        target: String,

        /// Addresses in hex, with or without 0x
        #[arg(value_name = "HEXADDR", required = true)]
        addresses: Vec<String>,

        /// Symbol tables read at the same time
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_LOADS)]
        max_concurrent_loads: usize,
    },

    /// Print the executable file mappings of a process
    Maps {
        /// Process ID or name
        #[arg(value_name = "PID|PROCESS")]
        target: String,
    },

    /// Decode JSFunction pointers as name:file:line
    Heap {
        /// Process ID or name
        #[arg(value_name = "PID|PROCESS")]
        target: String,

        /// Tagged JSFunction pointers in hex
        #[arg(value_name = "HEXPTR", required = true)]
        pointers: Vec<String>,

        /// JSON file overriding heap object offsets
        #[arg(long, value_name = "FILE")]
        layout: Option<PathBuf>,

        /// Nesting limit for cons strings
        #[arg(long, default_value_t = DEFAULT_MAX_CONS_DEPTH)]
        max_depth: usize,
    },

    /// Aggregate raw stack samples
    Aggregate {
        /// Raw stacks, one frame per line, blank line between stacks (stdin if omitted)
        #[arg(value_name = "FILE")]
        input: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Reverse the frame order of every stack, e.g. to fold leaf-first samples
        #[arg(long)]
        reverse: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented call tree with sample counts
    Text,
    /// dtrace ustack() text, for flame graph tools
    Dtracetext,
}
