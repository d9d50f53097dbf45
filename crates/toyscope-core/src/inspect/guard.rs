//! Traversal bounds for walks over target memory.
//!
//! Target structures are trusted to be acyclic, but a corrupted scope chain or
//! list must end the walk with an error instead of looping forever.

use std::collections::HashSet;

use crate::error::{Error, Result, TraversalLimit};

/// Nesting depth counter for recursive decoding.
#[derive(Debug)]
pub(crate) struct DepthGuard {
    max_depth: usize,
    depth: usize,
}

impl DepthGuard {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            depth: 0,
        }
    }

    pub(crate) fn enter(&mut self, address: u64) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(Error::CycleOrDepthExceeded {
                address,
                limit: TraversalLimit::Depth(self.max_depth),
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        self.depth
    }
}

/// Addresses already seen by one linear walk (a list or a scope chain).
#[derive(Debug, Default)]
pub(crate) struct Visited(HashSet<u64>);

impl Visited {
    pub(crate) fn insert(&mut self, address: u64) -> Result<()> {
        if self.0.insert(address) {
            Ok(())
        } else {
            Err(Error::CycleOrDepthExceeded {
                address,
                limit: TraversalLimit::Cycle,
            })
        }
    }
}
