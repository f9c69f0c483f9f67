//! Selva: an in-memory graph analytics engine.
//!
//! Loads a relationship store into a frozen, cache-friendly adjacency
//! representation over dense `u32` node ids, then runs batched
//! multi-source BFS traversals over it.
//!
//! The pipeline has three stages:
//!
//! 1. [`IdMapBuilder`] collects external store node ids and freezes them
//!    into an [`IdMap`] with contiguous internal ids.
//! 2. [`GraphBuilder`] imports relationships in parallel over disjoint
//!    node ranges and freezes them into a [`Graph`] holding an
//!    [`AdjacencyMatrix`] and, optionally, a [`WeightMap`].
//! 3. [`MultiSourceBfs`] traverses the frozen graph from up to 64
//!    sources per batch, coalescing same-depth arrivals into a single
//!    visitor callback.
//!
//! ```no_run
//! use selva::{
//!     Direction, GraphBuilder, GraphConfig, InMemorySource, MultiSourceBfs,
//! };
//!
//! # fn main() -> selva::Result<()> {
//! let source = InMemorySource::from_edges(&[(0, 1), (1, 2), (2, 0)]);
//! let pool = rayon::ThreadPoolBuilder::new().build().unwrap();
//! let graph = GraphBuilder::new(GraphConfig::default()).build(0u64..3, &source, &pool)?;
//!
//! let bfs = MultiSourceBfs::with_sources(&graph, Direction::Outgoing, [0]);
//! bfs.run(&pool, |node, depth, sources| {
//!     println!("{node} reached at depth {depth} by {} sources", sources.len());
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod logging;
pub mod model;
pub mod msbfs;
pub mod util;

pub use error::{GraphError, Result};
pub use graph::{
    AdjacencyMatrix, Graph, GraphBuilder, GraphConfig, IdMap, IdMapBuilder, InMemorySource,
    MergePolicy, RelationshipRecord, RelationshipSource, TraversalSource, WeightMap,
};
pub use logging::init_logging;
pub use model::{Direction, NodeId, RelationshipId, StoreNodeId, UNMAPPED};
pub use msbfs::{MultiSourceBfs, SourceSet, OMEGA};
pub use util::CancelFlag;
