//! Memory snapshots captured from a live process
//!
//! A snapshot is a JSON file of captured regions, plus the pointer width of
//! the process they came from when it was known at capture time:
//!
//! ```json
//! { "pointer_size": 8, "regions": [ { "address": 4096, "bytes": "48656c6c6f" } ] }
//! ```
//!
//! [`SnapshotReader`] serves reads that fall entirely within one region, so a
//! rendering can be reproduced after the traced process has exited.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::process::ReadMemory;

/// On-disk form of one captured region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRegion {
    pub address: u64,
    /// Region contents, hex encoded.
    pub bytes: String,
}

/// On-disk snapshot document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_size: Option<usize>,
    pub regions: Vec<SnapshotRegion>,
}

impl SnapshotFile {
    /// Capture `(address, len)` ranges through any reader, recording the
    /// reader's pointer width.
    pub fn capture<R: ReadMemory + ?Sized>(reader: &R, ranges: &[(u64, usize)]) -> Result<Self> {
        let mut regions = Vec::with_capacity(ranges.len());
        for &(address, len) in ranges {
            let bytes = reader.read_bytes(address, len)?;
            debug!("Captured {} bytes at {:#x}", len, address);
            regions.push(SnapshotRegion {
                address,
                bytes: hex::encode(bytes),
            });
        }
        Ok(Self {
            pointer_size: reader.pointer_size(),
            regions,
        })
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Region {
    address: u64,
    data: Vec<u8>,
}

impl Region {
    fn end(&self) -> u64 {
        self.address + self.data.len() as u64
    }
}

/// Reads from captured regions instead of a live process.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    regions: Vec<Region>,
    pointer_size: Option<usize>,
}

impl SnapshotReader {
    /// Build a reader from `(address, bytes)` regions.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotFormat` if two regions overlap.
    pub fn new(regions: Vec<(u64, Vec<u8>)>) -> Result<Self> {
        let mut regions: Vec<Region> = regions
            .into_iter()
            .map(|(address, data)| Region { address, data })
            .collect();
        regions.sort_by_key(|r| r.address);

        for pair in regions.windows(2) {
            if pair[0].end() > pair[1].address {
                return Err(Error::SnapshotFormat(format!(
                    "Regions at {:#x} and {:#x} overlap",
                    pair[0].address, pair[1].address
                )));
            }
        }

        Ok(Self {
            regions,
            pointer_size: None,
        })
    }

    /// Record the pointer width of the captured process.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotFormat` unless `width` is 4 or 8.
    pub fn with_pointer_size(mut self, width: usize) -> Result<Self> {
        if !matches!(width, 4 | 8) {
            return Err(Error::SnapshotFormat(format!(
                "pointer_size must be 4 or 8, got {}",
                width
            )));
        }
        self.pointer_size = Some(width);
        Ok(self)
    }

    pub fn from_file(file: SnapshotFile) -> Result<Self> {
        let regions = file
            .regions
            .into_iter()
            .map(|region| {
                hex::decode(&region.bytes)
                    .map(|data| (region.address, data))
                    .map_err(|e| {
                        Error::SnapshotFormat(format!(
                            "Region at {:#x} is not valid hex: {}",
                            region.address, e
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        let reader = Self::new(regions)?;
        match file.pointer_size {
            Some(width) => reader.with_pointer_size(width),
            None => Ok(reader),
        }
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(content)?;
        Self::from_file(file)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let reader = Self::from_json(&content)?;
        debug!(
            "Loaded snapshot {:?} with {} regions",
            path.as_ref(),
            reader.regions.len()
        );
        Ok(reader)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl ReadMemory for SnapshotReader {
    fn pointer_size(&self) -> Option<usize> {
        self.pointer_size
    }

    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }

        let end = address.checked_add(size as u64).ok_or_else(|| Error::MemoryReadFailed {
            address,
            message: "Address overflow".to_string(),
        })?;

        // Last region starting at or before `address`.
        let idx = self.regions.partition_point(|r| r.address <= address);
        let region = idx
            .checked_sub(1)
            .map(|i| &self.regions[i])
            .filter(|r| end <= r.end())
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: format!("{} bytes not captured in snapshot", size),
            })?;

        let offset = (address - region.address) as usize;
        Ok(region.data[offset..offset + size].to_vec())
    }
}
