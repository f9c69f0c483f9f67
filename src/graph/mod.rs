//! Graph materialization: dense id mapping, parallel adjacency
//! construction, and the frozen [`Graph`] view handed to algorithms.

mod builder;
mod config;
mod id_map;
mod matrix;
mod source;
mod weights;

pub use builder::GraphBuilder;
pub use config::GraphConfig;
pub use id_map::{IdMap, IdMapBuilder};
pub use matrix::AdjacencyMatrix;
pub use source::{InMemorySource, RelationshipRecord, RelationshipSource};
pub use weights::{MergePolicy, WeightMap};

use crate::model::{Direction, NodeId, RelationshipId, StoreNodeId};

/// Anything the traversal engines can walk: a node count and a neighbor
/// enumeration. Implemented by [`AdjacencyMatrix`] and [`Graph`]; tests
/// may substitute structurally equivalent sources.
pub trait TraversalSource: Sync {
    fn node_count(&self) -> usize;

    fn for_each_neighbor(&self, node: NodeId, direction: Direction, visit: &mut dyn FnMut(NodeId));
}

/// A materialized, read-only graph view.
///
/// Bundles the id mapping, the adjacency matrix, and the relationship
/// weights of one build. Lives for the duration of one or more algorithm
/// runs sharing the snapshot and is simply dropped afterwards; there is
/// no incremental update path.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    id_map: IdMap,
    matrix: AdjacencyMatrix,
    weights: WeightMap,
    relationship_count: u64,
    partial: bool,
}

impl Graph {
    pub(crate) fn new(
        id_map: IdMap,
        matrix: AdjacencyMatrix,
        weights: WeightMap,
        relationship_count: u64,
        partial: bool,
    ) -> Self {
        Self {
            id_map,
            matrix,
            weights,
            relationship_count,
            partial,
        }
    }

    pub fn node_count(&self) -> usize {
        self.id_map.node_count()
    }

    /// Number of materialized relationships. In undirected mode each
    /// symmetric pair counts once.
    pub fn relationship_count(&self) -> u64 {
        self.relationship_count
    }

    /// Whether the build was cancelled before covering every node range.
    /// Everything materialized is still well formed.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn id_map(&self) -> &IdMap {
        &self.id_map
    }

    pub fn matrix(&self) -> &AdjacencyMatrix {
        &self.matrix
    }

    pub fn weights(&self) -> &WeightMap {
        &self.weights
    }

    /// See [`IdMap::to_internal`].
    #[inline]
    pub fn to_internal(&self, external: StoreNodeId) -> NodeId {
        self.id_map.to_internal(external)
    }

    /// See [`IdMap::to_external`].
    #[inline]
    pub fn to_external(&self, internal: NodeId) -> StoreNodeId {
        self.id_map.to_external(internal)
    }

    pub fn degree(&self, node: NodeId, direction: Direction) -> usize {
        self.matrix.degree(node, direction)
    }

    pub fn for_each<F>(&self, node: NodeId, direction: Direction, consumer: F)
    where
        F: FnMut(NodeId, NodeId, RelationshipId),
    {
        self.matrix.for_each(node, direction, consumer);
    }

    pub fn for_each_weighted<F>(&self, node: NodeId, direction: Direction, consumer: F)
    where
        F: FnMut(NodeId, NodeId, RelationshipId, f64),
    {
        self.matrix
            .for_each_weighted(node, direction, &self.weights, consumer);
    }

    pub fn neighbors(
        &self,
        node: NodeId,
        direction: Direction,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.matrix.neighbors(node, direction)
    }

    pub fn has_edge(&self, node: NodeId, target: NodeId, direction: Direction) -> bool {
        self.matrix.has_edge(node, target, direction)
    }

    /// Resolved weight of `source -> target`; the configured default for
    /// relationships without a stored weight.
    pub fn weight(&self, source: NodeId, target: NodeId) -> f64 {
        self.weights.between(source, target)
    }
}

impl TraversalSource for Graph {
    fn node_count(&self) -> usize {
        self.id_map.node_count()
    }

    fn for_each_neighbor(&self, node: NodeId, direction: Direction, visit: &mut dyn FnMut(NodeId)) {
        self.matrix.for_each_neighbor(node, direction, visit);
    }
}
