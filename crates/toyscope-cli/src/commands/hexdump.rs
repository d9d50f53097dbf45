//! Hexdump command implementation.

use anyhow::{Context, Result};

use super::hex_utils::format_hex_dump;
use super::source::with_reader;
use crate::cli::SourceArgs;

/// Run the hexdump command
pub fn run(address: u64, size: usize, source: &SourceArgs) -> Result<()> {
    let bytes = with_reader(source, |reader| {
        reader
            .read_bytes(address, size)
            .with_context(|| format!("Failed to read {} bytes at {:#x}", size, address))
    })?;

    for line in format_hex_dump(address, &bytes) {
        println!("{}", line);
    }
    Ok(())
}
