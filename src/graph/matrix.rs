//! The frozen adjacency structure.
//!
//! For every internal node id and loaded direction the matrix stores an
//! exactly-sized neighbor array plus a parallel array of relationship
//! ids. Arrays are armed at their final size before the parallel fill and
//! never reallocate; after construction the whole structure is read-only
//! and safe for unsynchronized concurrent reads.

use crate::model::{pack_ids, Direction, NodeId, RelationshipId};

use super::weights::WeightMap;
use super::TraversalSource;

/// One node's neighbors in one direction, with the relationship id of
/// each entry. When sorted loading was requested, entries are ordered by
/// `(target, relationship id)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct NodeList {
    pub(crate) targets: Box<[NodeId]>,
    pub(crate) rels: Box<[RelationshipId]>,
}

static EMPTY_TARGETS: &[NodeId] = &[];
static EMPTY_RELS: &[RelationshipId] = &[];

/// CSR-like read-only adjacency matrix produced by the parallel builder.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyMatrix {
    node_count: usize,
    outgoing: Option<Vec<NodeList>>,
    incoming: Option<Vec<NodeList>>,
    sorted: bool,
}

impl AdjacencyMatrix {
    pub(crate) fn new(
        node_count: usize,
        outgoing: Option<Vec<NodeList>>,
        incoming: Option<Vec<NodeList>>,
        sorted: bool,
    ) -> Self {
        debug_assert!(outgoing.as_ref().map_or(true, |o| o.len() == node_count));
        debug_assert!(incoming.as_ref().map_or(true, |i| i.len() == node_count));
        Self {
            node_count,
            outgoing,
            incoming,
            sorted,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Whether neighbor lists are sorted and deduplicated.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    fn list(&self, node: NodeId, direction: Direction) -> (&[NodeId], &[RelationshipId]) {
        let lists = match direction {
            Direction::Outgoing => &self.outgoing,
            Direction::Incoming => &self.incoming,
            Direction::Both => unreachable!("resolved by callers"),
        };
        match lists {
            Some(lists) => {
                let list = &lists[node as usize];
                (&list.targets, &list.rels)
            }
            None => (EMPTY_TARGETS, EMPTY_RELS),
        }
    }

    /// Degree of `node` in `direction`. A direction that was not loaded
    /// counts as zero.
    pub fn degree(&self, node: NodeId, direction: Direction) -> usize {
        match direction {
            Direction::Both => {
                self.list(node, Direction::Outgoing).0.len()
                    + self.list(node, Direction::Incoming).0.len()
            }
            dir => self.list(node, dir).0.len(),
        }
    }

    /// Invokes `consumer(node, neighbor, relationship_id)` for every
    /// relationship at `node` in `direction`.
    pub fn for_each<F>(&self, node: NodeId, direction: Direction, mut consumer: F)
    where
        F: FnMut(NodeId, NodeId, RelationshipId),
    {
        match direction {
            Direction::Both => {
                self.for_each_in(node, Direction::Outgoing, &mut consumer);
                self.for_each_in(node, Direction::Incoming, &mut consumer);
            }
            dir => self.for_each_in(node, dir, &mut consumer),
        }
    }

    fn for_each_in<F>(&self, node: NodeId, direction: Direction, consumer: &mut F)
    where
        F: FnMut(NodeId, NodeId, RelationshipId),
    {
        let (targets, rels) = self.list(node, direction);
        for (&target, &rel) in targets.iter().zip(rels.iter()) {
            consumer(node, target, rel);
        }
    }

    /// Weighted variant of [`for_each`](Self::for_each): additionally
    /// supplies the resolved edge weight from `weights`. Keys are packed
    /// in actual source -> target orientation regardless of the
    /// iteration direction.
    pub fn for_each_weighted<F>(
        &self,
        node: NodeId,
        direction: Direction,
        weights: &WeightMap,
        mut consumer: F,
    ) where
        F: FnMut(NodeId, NodeId, RelationshipId, f64),
    {
        let mut visit = |node: NodeId, dir: Direction| {
            let (targets, rels) = self.list(node, dir);
            for (&neighbor, &rel) in targets.iter().zip(rels.iter()) {
                let key = match dir {
                    Direction::Incoming => pack_ids(neighbor, node),
                    _ => pack_ids(node, neighbor),
                };
                consumer(node, neighbor, rel, weights.get(key));
            }
        };
        match direction {
            Direction::Both => {
                visit(node, Direction::Outgoing);
                visit(node, Direction::Incoming);
            }
            dir => visit(node, dir),
        }
    }

    /// Cursor form: iterates `(node, neighbor, relationship_id)` triples.
    pub fn relationships(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> impl Iterator<Item = (NodeId, NodeId, RelationshipId)> + '_ {
        let (out, out_rels, inc, inc_rels) = match direction {
            Direction::Outgoing => {
                let (t, r) = self.list(node, Direction::Outgoing);
                (t, r, EMPTY_TARGETS, EMPTY_RELS)
            }
            Direction::Incoming => {
                let (t, r) = self.list(node, Direction::Incoming);
                (EMPTY_TARGETS, EMPTY_RELS, t, r)
            }
            Direction::Both => {
                let (ot, or) = self.list(node, Direction::Outgoing);
                let (it, ir) = self.list(node, Direction::Incoming);
                (ot, or, it, ir)
            }
        };
        out.iter()
            .zip(out_rels.iter())
            .chain(inc.iter().zip(inc_rels.iter()))
            .map(move |(&target, &rel)| (node, target, rel))
    }

    /// Iterates the neighbor ids of `node` in `direction`.
    pub fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.relationships(node, direction)
            .map(|(_, neighbor, _)| neighbor)
    }

    /// Whether an edge from `node` to `target` exists in `direction`.
    /// Binary search on sorted lists, linear scan otherwise.
    pub fn has_edge(&self, node: NodeId, target: NodeId, direction: Direction) -> bool {
        match direction {
            Direction::Both => {
                self.has_edge(node, target, Direction::Outgoing)
                    || self.has_edge(node, target, Direction::Incoming)
            }
            dir => {
                let (targets, _) = self.list(node, dir);
                if self.sorted {
                    targets.binary_search(&target).is_ok()
                } else {
                    targets.contains(&target)
                }
            }
        }
    }
}

impl TraversalSource for AdjacencyMatrix {
    fn node_count(&self) -> usize {
        self.node_count
    }

    fn for_each_neighbor(&self, node: NodeId, direction: Direction, visit: &mut dyn FnMut(NodeId)) {
        match direction {
            Direction::Both => {
                for &target in self.list(node, Direction::Outgoing).0 {
                    visit(target);
                }
                for &target in self.list(node, Direction::Incoming).0 {
                    visit(target);
                }
            }
            dir => {
                for &target in self.list(node, dir).0 {
                    visit(target);
                }
            }
        }
    }
}
