//! Dense id mapping.
//!
//! Bijects arbitrary 64-bit external node identifiers onto the contiguous
//! `0..node_count` internal id space. Externals are collected through an
//! [`IdMapBuilder`], then sorted and deduplicated by [`IdMapBuilder::build`];
//! the resulting [`IdMap`] is immutable and safe for unsynchronized
//! concurrent reads.

use std::collections::HashMap;
use std::ops::Range;

use crate::error::Result;
use crate::model::{NodeId, StoreNodeId, UNMAPPED};
use crate::util;

/// Collects external node ids for a graph view under construction.
#[derive(Debug, Default)]
pub struct IdMapBuilder {
    externals: Vec<StoreNodeId>,
}

impl IdMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            externals: Vec::with_capacity(capacity),
        }
    }

    /// Registers an external id. Duplicates are tolerated and collapse
    /// during [`build`](Self::build).
    pub fn add(&mut self, external: StoreNodeId) {
        self.externals.push(external);
    }

    /// Sorts and deduplicates the collected externals and freezes the
    /// mapping. Internal ids are assigned in ascending external-id order.
    pub fn build(self) -> IdMap {
        let mut externals = self.externals;
        externals.sort_unstable();
        externals.dedup();

        let mut to_internal = HashMap::with_capacity(externals.len());
        for (internal, &external) in externals.iter().enumerate() {
            to_internal.insert(external, internal as NodeId);
        }
        IdMap {
            externals,
            to_internal,
        }
    }
}

impl Extend<StoreNodeId> for IdMapBuilder {
    fn extend<T: IntoIterator<Item = StoreNodeId>>(&mut self, iter: T) {
        self.externals.extend(iter);
    }
}

/// The frozen bijection between external and internal node ids.
///
/// Every internal id maps to exactly one external id and vice versa; the
/// mapping is total once built. All accessors take `&self` and the type
/// is `Sync`: reads never synchronize.
#[derive(Debug, Clone, PartialEq)]
pub struct IdMap {
    externals: Vec<StoreNodeId>,
    to_internal: HashMap<StoreNodeId, NodeId>,
}

impl IdMap {
    /// Number of mapped nodes.
    pub fn node_count(&self) -> usize {
        self.externals.len()
    }

    /// Maps an external id to its internal id, or [`UNMAPPED`] if the
    /// external is absent from this graph view. Never fails: callers
    /// must treat the sentinel as "node absent".
    #[inline]
    pub fn to_internal(&self, external: StoreNodeId) -> NodeId {
        self.to_internal.get(&external).copied().unwrap_or(UNMAPPED)
    }

    /// Maps an internal id back to its external id.
    ///
    /// # Panics
    /// Panics if `internal >= node_count()`; internal ids only come from
    /// this map, so an out-of-range id is a caller bug.
    #[inline]
    pub fn to_external(&self, internal: NodeId) -> StoreNodeId {
        self.externals[internal as usize]
    }

    pub fn contains(&self, external: StoreNodeId) -> bool {
        self.to_internal.contains_key(&external)
    }

    /// Iterates the internal id space in order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        0..self.externals.len() as NodeId
    }

    /// Splits the internal id space into contiguous ranges of at most
    /// `batch_size` nodes, one per import worker.
    pub fn batched_ranges(&self, batch_size: usize) -> Result<Vec<Range<NodeId>>> {
        let count = self.node_count();
        let batches = util::thread_size(batch_size, count)?;
        let mut ranges = Vec::with_capacity(batches);
        let mut start = 0usize;
        while start < count {
            let end = (start + batch_size).min(count);
            ranges.push(start as NodeId..end as NodeId);
            start = end;
        }
        Ok(ranges)
    }
}
