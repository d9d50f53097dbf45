//! CLI argument definitions for toyscope.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use toyscope_core::{ElementStyle, parse_address};

use crate::commands::hex_utils::{Region, parse_region};

#[derive(Parser)]
#[command(name = "toyscope")]
#[command(about = "Inspect toyscript interpreter state in a live process or snapshot", version)]
pub struct Args {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Where target memory comes from.
#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Process ID of a running interpreter
    #[arg(long)]
    pub pid: Option<u32>,
    /// Process name of a running interpreter
    #[arg(long)]
    pub process: Option<String>,
    /// Snapshot file captured earlier
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,
}

/// Live process only; capturing from a snapshot makes no sense.
#[derive(ClapArgs, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct LiveSourceArgs {
    /// Process ID of a running interpreter
    #[arg(long)]
    pub pid: Option<u32>,
    /// Process name of a running interpreter
    #[arg(long)]
    pub process: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Render a typed memory cell
    Render {
        /// Declared type of the cell (e.g. "Namespace", "struct Element *")
        #[arg(long = "type", value_name = "TYPE")]
        ty: String,
        /// Cell address (hex, e.g. 0x55d0c0a01230)
        #[arg(long, value_parser = parse_address)]
        address: u64,
        #[command(flatten)]
        source: SourceArgs,
        /// Inspector config file (TOML)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
        /// Print namespace keys without values
        #[arg(long)]
        keys_only: bool,
        /// Element style: bare or tagged
        #[arg(long)]
        style: Option<ElementStyle>,
        /// Maximum nesting depth
        #[arg(long)]
        max_depth: Option<usize>,
        /// Print the decoded tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Capture memory regions of a live process into a snapshot file
    Capture {
        #[command(flatten)]
        source: LiveSourceArgs,
        /// Region to capture as ADDR:LEN (hex address, length in bytes)
        #[arg(long = "region", value_name = "ADDR:LEN", value_parser = parse_region, required = true)]
        regions: Vec<Region>,
        /// Output file path (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Dump raw bytes from memory (hexdump)
    Hexdump {
        /// Start address (hex, e.g. 0x55d0c0a01230)
        #[arg(long, value_parser = parse_address)]
        address: u64,
        /// Number of bytes to dump
        #[arg(long, default_value = "256")]
        size: usize,
        #[command(flatten)]
        source: SourceArgs,
    },
}
