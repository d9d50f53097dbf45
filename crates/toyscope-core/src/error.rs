use std::fmt;

use thiserror::Error;

/// Which traversal bound was hit while walking target structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalLimit {
    /// An address already visited in the same walk was reached again.
    Cycle,
    /// Nesting went deeper than the configured maximum.
    Depth(usize),
}

impl fmt::Display for TraversalLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalLimit::Cycle => write!(f, "address revisited"),
            TraversalLimit::Depth(max) => write!(f, "depth exceeds {}", max),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Traversal stopped at {address:#x}: {limit}")]
    CycleOrDepthExceeded { address: u64, limit: TraversalLimit },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Config parse error: {0}")]
    ConfigParseError(String),

    #[error("Snapshot format error: {0}")]
    SnapshotFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for errors raised by the traversal guard rather than by memory access.
    pub fn is_traversal_limit(&self) -> bool {
        matches!(self, Error::CycleOrDepthExceeded { .. })
    }
}
