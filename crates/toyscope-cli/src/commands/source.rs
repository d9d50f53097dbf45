//! Binding commands to a memory source.

use anyhow::{Context, Result};
use toyscope_core::{MemoryReader, ProcessHandle, ReadMemory, SnapshotReader};
use tracing::info;

use crate::cli::{LiveSourceArgs, SourceArgs};

/// Open a process by PID or by name.
pub fn open_process(pid: Option<u32>, name: Option<&str>) -> Result<ProcessHandle> {
    let process = match (pid, name) {
        (Some(pid), _) => ProcessHandle::open(pid)
            .with_context(|| format!("Failed to open process {}", pid))?,
        (None, Some(name)) => ProcessHandle::find_by_name(name)
            .with_context(|| format!("Failed to find process {:?}", name))?,
        (None, None) => anyhow::bail!("Either --pid or --process is required"),
    };
    info!("Opened process (PID: {})", process.pid);
    Ok(process)
}

pub fn open_live(source: &LiveSourceArgs) -> Result<ProcessHandle> {
    open_process(source.pid, source.process.as_deref())
}

/// Run `f` against the reader named by `source`.
pub fn with_reader<T>(source: &SourceArgs, f: impl FnOnce(&dyn ReadMemory) -> Result<T>) -> Result<T> {
    if let Some(path) = &source.snapshot {
        let snapshot = SnapshotReader::load(path)
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        info!(
            "Loaded snapshot {} ({} regions)",
            path.display(),
            snapshot.region_count()
        );
        return f(&snapshot);
    }

    let process = open_process(source.pid, source.process.as_deref())?;
    let reader = MemoryReader::new(&process);
    f(&reader)
}
