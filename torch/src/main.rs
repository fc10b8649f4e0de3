//! # torch - Main Entry Point
//!
//! One subcommand per resolver:
//! - **atos**: native addresses through the process's ELF symbol tables
//! - **maps**: the executable mapping table those lookups start from
//! - **heap**: JavaScript function pointers through the runtime heap
//! - **aggregate**: folding of raw stack samples into a call tree or flame graph input

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use torch::analysis::{parse_raw_stacks, write_dtrace_text, CallTree};
use torch::cli::{Args, Command, OutputFormat};
use torch::domain::{Address, Pid};
use torch::heap::HeapLayout;
use torch::preflight::{open_heap_reader, run_preflight_checks};
use torch::process_lookup::resolve_target;
use torch::symbolization::{process_maps, Symbolicator};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = format!("{err:#}").to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else if msg.contains("invalid address") {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Atos { target, addresses, max_concurrent_loads } => {
            let addresses = parse_addresses(&addresses)?;
            let pid = resolve_live_target(&target)?;

            let symbolicator = Symbolicator::load_for_pid(pid, max_concurrent_loads)
                .await
                .with_context(|| format!("Failed to load symbols for {pid}"))?;
            info!("Loaded {} mappings of {pid}", symbolicator.binaries().len());

            let mut out = BufWriter::new(io::stdout().lock());
            for addr in addresses {
                writeln!(out, "{addr}: {}", symbolicator.atos(addr.0))?;
            }
            out.flush()?;
        }

        Command::Maps { target } => {
            let pid = resolve_live_target(&target)?;
            let mut maps = process_maps::load(pid)?;

            let mut out = BufWriter::new(io::stdout().lock());
            maps.print(&mut out)?;
            out.flush()?;
        }

        Command::Heap { target, pointers, layout, max_depth } => {
            let pointers = parse_addresses(&pointers)?;
            let pid = resolve_live_target(&target)?;

            let layout = match layout {
                Some(path) => load_layout(&path)?,
                None => HeapLayout::default(),
            };
            let mut reader = open_heap_reader(pid, layout)?.with_max_cons_depth(max_depth);

            let mut out = BufWriter::new(io::stdout().lock());
            for ptr in pointers {
                writeln!(out, "{ptr}: {}", reader.read_function(ptr.0))?;
            }
            out.flush()?;
        }

        Command::Aggregate { input, format, reverse } => {
            let text = read_input(input.as_deref())?;
            let mut stacks = parse_raw_stacks(&text);
            info!("Parsed {} stacks", stacks.len());

            if reverse {
                stacks.iter_mut().for_each(|stack| stack.reverse());
            }

            let mut out = BufWriter::new(io::stdout().lock());
            match format {
                OutputFormat::Text => write!(out, "{}", CallTree::aggregate(&stacks))?,
                OutputFormat::Dtracetext => write_dtrace_text(&stacks, &mut out)?,
            }
            out.flush()?;
        }
    }

    Ok(())
}

/// Resolve `<PID|PROCESS>` and check the process can be inspected
fn resolve_live_target(target: &str) -> Result<Pid> {
    let pid = resolve_target(target)?;
    run_preflight_checks(pid)?;
    Ok(pid)
}

fn parse_addresses(raw: &[String]) -> Result<Vec<Address>> {
    raw.iter()
        .map(|s| s.parse::<Address>().with_context(|| format!("Invalid address: {s}")))
        .collect()
}

fn load_layout(path: &Path) -> Result<HeapLayout> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read layout file: {}", path.display()))?;
    HeapLayout::from_json(&json)
        .with_context(|| format!("Invalid layout file: {}", path.display()))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    let mut text = String::new();
    match path {
        Some(path) => {
            File::open(path)
                .and_then(|mut f| f.read_to_string(&mut text))
                .with_context(|| format!("Failed to read {}", path.display()))?;
        }
        None => {
            io::stdin().read_to_string(&mut text).context("Failed to read stdin")?;
        }
    }
    Ok(text)
}
