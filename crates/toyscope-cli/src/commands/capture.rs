//! Capture command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use toyscope_core::{MemoryReader, ReadMemory, SnapshotFile};
use tracing::warn;

use super::hex_utils::Region;
use super::source::open_live;
use crate::cli::LiveSourceArgs;

/// Read `regions` through `reader` and write them as a snapshot file.
pub fn capture_to<R: ReadMemory + ?Sized>(reader: &R, regions: &[Region], output: &Path) -> Result<usize> {
    let ranges: Vec<(u64, usize)> = regions.iter().map(|r| (r.address, r.len)).collect();
    let snapshot = SnapshotFile::capture(reader, &ranges).context("Failed to capture regions")?;
    snapshot
        .save(output)
        .with_context(|| format!("Failed to write snapshot {}", output.display()))?;
    Ok(ranges.iter().map(|(_, len)| len).sum())
}

/// Run the capture command
pub fn run(source: &LiveSourceArgs, regions: &[Region], output: &Path) -> Result<()> {
    let process = open_live(source)?;
    let reader = MemoryReader::new(&process);

    if reader.pointer_size().is_none() {
        warn!("Could not determine the pointer size of PID {}", process.pid);
    }
    let total = capture_to(&reader, regions, output)?;
    println!(
        "Captured {} regions ({} bytes) from PID {} to {}",
        regions.len(),
        total,
        process.pid,
        output.display()
    );
    Ok(())
}
