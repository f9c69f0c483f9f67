//! Multi-source breadth-first search.
//!
//! Runs up to [`OMEGA`] BFS traversals in one pass by giving every
//! source a bit position within per-node 64-bit words. Traversals that
//! reach the same node at the same depth collapse into a single visitor
//! callback carrying the whole source bitset, which is what makes `k`
//! sources cost `O(ceil(k/64) * (V+E))` instead of `O(k * (V+E))`.
//!
//! Per node the engine keeps two words: `seen` (sources that have ever
//! visited the node, bits are never cleared) and the next frontier. A
//! level ORs the current frontier word of every active node into its
//! neighbors' next words; applying `next & !seen` before flushing is
//! what prevents a source from revisiting a node through a cycle.
//!
//! Batches over more than [`OMEGA`] sources are independent and run in
//! parallel on the pool passed to [`MultiSourceBfs::run`]; within one
//! batch, levels are strictly sequential. The visitor may therefore be
//! called from several threads at once and must be thread-safe.
//!
//! Described in "The More the Merrier: Efficient Multi-Source Graph
//! Traversal" (Then et al., VLDB 2015).

use rayon::prelude::*;
use tracing::debug;

use crate::error::{GraphError, Result};
use crate::graph::TraversalSource;
use crate::model::{Direction, NodeId};
use crate::util::CancelFlag;

/// Sources traversed simultaneously per batch: one bit per source.
pub const OMEGA: usize = 64;

#[derive(Debug, Clone, Copy)]
enum SourceKind<'a> {
    /// Explicit, sorted source list; bit `i` is `sources[i]`.
    Listed(&'a [NodeId]),
    /// Every node is a source; bit `i` is `start + i`.
    Offset(NodeId),
}

/// The set of sources arriving at a node in one flush.
///
/// Borrowed state: only valid during the visitor callback. Callers that
/// need to keep the sources collect them from [`iter`](Self::iter).
#[derive(Debug, Clone, Copy)]
pub struct SourceSet<'a> {
    mask: u64,
    kind: SourceKind<'a>,
}

impl SourceSet<'_> {
    /// Number of sources in this flush.
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Whether `source` is part of this flush.
    pub fn contains(&self, source: NodeId) -> bool {
        match self.kind {
            SourceKind::Listed(sources) => sources
                .binary_search(&source)
                .is_ok_and(|i| self.mask & (1u64 << i) != 0),
            SourceKind::Offset(start) => {
                source >= start
                    && (source - start) < OMEGA as NodeId
                    && self.mask & (1u64 << (source - start)) != 0
            }
        }
    }

    /// Iterates the source node ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        let mask = self.mask;
        let kind = self.kind;
        (0..OMEGA as u32)
            .filter(move |i| mask & (1u64 << i) != 0)
            .map(move |i| match kind {
                SourceKind::Listed(sources) => sources[i as usize],
                SourceKind::Offset(start) => start + i,
            })
    }
}

#[derive(Debug, Clone, Copy)]
enum Batch<'a> {
    Listed(&'a [NodeId]),
    Offset { start: NodeId, len: usize },
}

/// Per-batch frontier state, reused across the batches a worker runs.
struct BatchState {
    visit: Vec<u64>,
    next: Vec<u64>,
    seen: Vec<u64>,
}

impl BatchState {
    fn new(node_count: usize) -> Self {
        Self {
            visit: vec![0; node_count],
            next: vec![0; node_count],
            seen: vec![0; node_count],
        }
    }

    fn reset(&mut self) {
        self.visit.fill(0);
        self.next.fill(0);
        self.seen.fill(0);
    }
}

/// Multi-source BFS over any [`TraversalSource`].
///
/// The visitor receives `(node, depth, sources)` once per node and depth
/// within a batch; sources reaching the node at the same depth are
/// coalesced. Visit order within a level is unspecified.
pub struct MultiSourceBfs<'a, G: TraversalSource> {
    graph: &'a G,
    direction: Direction,
    sources: Option<Vec<NodeId>>,
    max_depth: Option<usize>,
    cancel: CancelFlag,
}

impl<'a, G: TraversalSource> MultiSourceBfs<'a, G> {
    /// Traversal with every node of the graph as a source.
    pub fn new(graph: &'a G, direction: Direction) -> Self {
        Self {
            graph,
            direction,
            sources: None,
            max_depth: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Traversal from an explicit source set. Duplicates collapse; an
    /// empty set traverses nothing.
    pub fn with_sources(
        graph: &'a G,
        direction: Direction,
        sources: impl IntoIterator<Item = NodeId>,
    ) -> Self {
        let mut sources: Vec<NodeId> = sources.into_iter().collect();
        sources.sort_unstable();
        sources.dedup();
        Self {
            graph,
            direction,
            sources: Some(sources),
            max_depth: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Bounds the traversal depth: nodes are flushed up to and including
    /// `max_depth`, then the batch stops. A bound of zero flushes nothing.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Attaches a cancellation flag polled between levels. Cancellation
    /// is not an error; everything flushed before it stands.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the traversal, batching sources into groups of [`OMEGA`]
    /// and executing independent batches in parallel on `pool`.
    ///
    /// `visitor(node, depth, sources)` must be thread-safe: batches may
    /// flush concurrently. Within a batch each (source, node) pair is
    /// flushed exactly once.
    pub fn run<V>(&self, pool: &rayon::ThreadPool, visitor: V) -> Result<()>
    where
        V: Fn(NodeId, usize, &SourceSet<'_>) + Sync,
    {
        let node_count = self.graph.node_count();
        if let Some(sources) = &self.sources {
            if let Some(&out) = sources.iter().find(|&&s| s as usize >= node_count) {
                return Err(GraphError::InvalidArgument(format!(
                    "source node {out} outside the internal id space 0..{node_count}"
                )));
            }
        }

        let batches = self.batches(node_count);
        if batches.is_empty() {
            return Ok(());
        }
        debug!(
            node_count,
            batches = batches.len(),
            direction = ?self.direction,
            "running multi-source bfs"
        );

        let visitor = &visitor;
        pool.install(|| {
            batches
                .par_iter()
                .for_each_init(|| BatchState::new(node_count), |state, batch| {
                    self.run_batch(state, *batch, visitor);
                });
        });
        Ok(())
    }

    fn batches(&self, node_count: usize) -> Vec<Batch<'_>> {
        match &self.sources {
            Some(sources) => sources.chunks(OMEGA).map(Batch::Listed).collect(),
            None => {
                let mut batches = Vec::with_capacity(node_count.div_ceil(OMEGA));
                let mut start = 0usize;
                while start < node_count {
                    let len = OMEGA.min(node_count - start);
                    batches.push(Batch::Offset {
                        start: start as NodeId,
                        len,
                    });
                    start += len;
                }
                batches
            }
        }
    }

    fn run_batch<V>(&self, state: &mut BatchState, batch: Batch<'_>, visitor: &V)
    where
        V: Fn(NodeId, usize, &SourceSet<'_>) + Sync,
    {
        state.reset();
        let BatchState { visit, next, seen } = state;

        let kind = match batch {
            Batch::Listed(sources) => {
                for (bit, &source) in sources.iter().enumerate() {
                    seen[source as usize] = 1u64 << bit;
                    visit[source as usize] |= 1u64 << bit;
                }
                SourceKind::Listed(sources)
            }
            Batch::Offset { start, len } => {
                for bit in 0..len {
                    let source = start as usize + bit;
                    seen[source] = 1u64 << bit;
                    visit[source] |= 1u64 << bit;
                }
                SourceKind::Offset(start)
            }
        };

        let node_count = visit.len();
        let mut depth = 0usize;
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            // Checked before expansion so that a bound of zero flushes
            // nothing at all.
            if self.max_depth.is_some_and(|max| depth >= max) {
                return;
            }

            for node in 0..node_count {
                let word = visit[node];
                if word != 0 {
                    self.graph
                        .for_each_neighbor(node as NodeId, self.direction, &mut |target| {
                            next[target as usize] |= word;
                        });
                }
            }

            depth += 1;

            let mut has_next = false;
            for node in 0..node_count {
                if next[node] != 0 {
                    // Sources that already saw this node at an earlier
                    // level must not re-trigger a visit.
                    let applied = next[node] & !seen[node];
                    next[node] = applied;
                    if applied != 0 {
                        seen[node] |= applied;
                        let sources = SourceSet {
                            mask: applied,
                            kind,
                        };
                        visitor(node as NodeId, depth, &sources);
                        has_next = true;
                    }
                }
            }

            if !has_next {
                return;
            }

            std::mem::swap(visit, next);
            next.fill(0);
        }
    }
}
