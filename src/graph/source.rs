//! The narrow interface to the external graph store.
//!
//! The builder needs exactly two things from a store: the exact degree of
//! a node (for arming) and an enumeration of its relationships (for
//! filling). Anything else, query languages and transactions included,
//! belongs to the excluded store-adapter layer.

use std::collections::HashMap;

use crate::error::Result;
use crate::model::{Direction, RelationshipId, StoreNodeId};

/// One enumerated relationship, seen from the node being loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelationshipRecord {
    /// External id of the node on the other end.
    pub neighbor: StoreNodeId,
    /// Opaque relationship id from the store.
    pub rel: RelationshipId,
    /// Relationship weight, if the source carries one.
    pub weight: Option<f64>,
}

/// A read-only relationship stream from the external store.
///
/// The two-pass protocol requires `degree` to report exactly the number
/// of records `for_each` will yield for the same node and direction; a
/// mismatch fails the build. Implementations must be `Sync`: workers on
/// disjoint node ranges query concurrently.
pub trait RelationshipSource: Sync {
    /// Exact relationship count of `node` in `direction`. Nodes unknown
    /// to the source have degree zero.
    fn degree(&self, node: StoreNodeId, direction: Direction) -> Result<usize>;

    /// Enumerates the relationships of `node` in `direction`.
    fn for_each(
        &self,
        node: StoreNodeId,
        direction: Direction,
        visit: &mut dyn FnMut(RelationshipRecord),
    ) -> Result<()>;
}

/// Edge-list backed relationship source.
///
/// The reference adapter: used by tests and benches, and convenient for
/// callers who already hold the relationships in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    outgoing: HashMap<StoreNodeId, Vec<RelationshipRecord>>,
    incoming: HashMap<StoreNodeId, Vec<RelationshipRecord>>,
    next_rel: RelationshipId,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source built from unweighted `(source, target)` pairs.
    pub fn from_edges(edges: &[(StoreNodeId, StoreNodeId)]) -> Self {
        let mut source = Self::new();
        for &(s, t) in edges {
            source.add(s, t);
        }
        source
    }

    /// Adds an unweighted relationship, returning its assigned id.
    /// Relationship ids are assigned in insertion order.
    pub fn add(&mut self, source: StoreNodeId, target: StoreNodeId) -> RelationshipId {
        self.insert(source, target, None)
    }

    /// Adds a weighted relationship, returning its assigned id.
    pub fn add_weighted(
        &mut self,
        source: StoreNodeId,
        target: StoreNodeId,
        weight: f64,
    ) -> RelationshipId {
        self.insert(source, target, Some(weight))
    }

    fn insert(
        &mut self,
        source: StoreNodeId,
        target: StoreNodeId,
        weight: Option<f64>,
    ) -> RelationshipId {
        let rel = self.next_rel;
        self.next_rel += 1;
        self.outgoing.entry(source).or_default().push(RelationshipRecord {
            neighbor: target,
            rel,
            weight,
        });
        self.incoming.entry(target).or_default().push(RelationshipRecord {
            neighbor: source,
            rel,
            weight,
        });
        rel
    }

    /// Total number of relationships added.
    pub fn relationship_count(&self) -> usize {
        self.next_rel as usize
    }

    fn records(&self, node: StoreNodeId, direction: Direction) -> (&[RelationshipRecord], &[RelationshipRecord]) {
        let out = self
            .outgoing
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let inc = self
            .incoming
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or_default();
        match direction {
            Direction::Outgoing => (out, &[]),
            Direction::Incoming => (&[], inc),
            Direction::Both => (out, inc),
        }
    }
}

impl RelationshipSource for InMemorySource {
    fn degree(&self, node: StoreNodeId, direction: Direction) -> Result<usize> {
        let (out, inc) = self.records(node, direction);
        Ok(out.len() + inc.len())
    }

    fn for_each(
        &self,
        node: StoreNodeId,
        direction: Direction,
        visit: &mut dyn FnMut(RelationshipRecord),
    ) -> Result<()> {
        let (out, inc) = self.records(node, direction);
        for record in out.iter().chain(inc.iter()) {
            visit(*record);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrees_match_enumeration() {
        let mut source = InMemorySource::new();
        source.add(10, 20);
        source.add(10, 30);
        source.add_weighted(30, 10, 2.0);

        for direction in [Direction::Outgoing, Direction::Incoming, Direction::Both] {
            for node in [10, 20, 30, 99] {
                let mut count = 0;
                source
                    .for_each(node, direction, &mut |_| count += 1)
                    .expect("enumerate");
                assert_eq!(source.degree(node, direction).expect("degree"), count);
            }
        }
        assert_eq!(source.degree(10, Direction::Outgoing).unwrap(), 2);
        assert_eq!(source.degree(10, Direction::Both).unwrap(), 3);
        assert_eq!(source.degree(99, Direction::Both).unwrap(), 0);
    }

    #[test]
    fn relationship_ids_follow_insertion_order() {
        let mut source = InMemorySource::new();
        let first = source.add(1, 2);
        let second = source.add(1, 2);
        assert!(first < second);

        let mut rels = Vec::new();
        source
            .for_each(1, Direction::Outgoing, &mut |r| rels.push(r.rel))
            .expect("enumerate");
        assert_eq!(rels, vec![first, second]);
    }
}
