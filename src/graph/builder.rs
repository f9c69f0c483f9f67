//! Parallel adjacency construction.
//!
//! The builder turns a relationship stream into an [`AdjacencyMatrix`]
//! without locks on shared state. The internal node-id space is split
//! into contiguous ranges, one per worker; each worker runs the two-pass
//! protocol per node (query the exact degree, arm an exactly-sized
//! array, fill it from the stream) and optionally sorts and collapses
//! duplicates. Partition disjointness means no two workers ever touch
//! the same node's arrays; the only synchronized regions are the final
//! weight-map merge and the shared progress counter.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::model::{pack_ids, Direction, NodeId, RelationshipId, StoreNodeId, UNMAPPED};
use crate::util::{adjust_batch_size, CancelFlag};

use super::config::GraphConfig;
use super::id_map::{IdMap, IdMapBuilder};
use super::matrix::{AdjacencyMatrix, NodeList};
use super::source::RelationshipSource;
use super::weights::{resolve_duplicates, WeightMap};
use super::Graph;

/// One collected relationship entry, already mapped to internal ids.
#[derive(Debug, Clone, Copy)]
struct Entry {
    neighbor: NodeId,
    rel: RelationshipId,
    weight: Option<f64>,
}

/// Per-range output of one import worker.
struct RangeBlock {
    outgoing: Option<Vec<NodeList>>,
    incoming: Option<Vec<NodeList>>,
}

/// Materializes [`Graph`] views from a [`RelationshipSource`].
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    config: GraphConfig,
    cancel: CancelFlag,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Attaches a cancellation flag polled between node iterations. A
    /// cancelled build still returns a well-formed graph; ranges not
    /// reached stay empty and [`Graph::is_partial`] reports it.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Builds a graph over `nodes` from `source` on the given pool.
    ///
    /// `nodes` is the external node-id universe of this graph view;
    /// externals enumerated by the source but absent from `nodes` are
    /// silently skipped as unmapped. A store-read failure or a degree
    /// mismatch aborts the build with no partial graph.
    pub fn build<S, I>(
        &self,
        nodes: I,
        source: &S,
        pool: &rayon::ThreadPool,
    ) -> Result<Graph>
    where
        S: RelationshipSource,
        I: IntoIterator<Item = StoreNodeId>,
    {
        self.config.validate()?;

        let mut ids = IdMapBuilder::new();
        ids.extend(nodes);
        let id_map = ids.build();
        let node_count = id_map.node_count();
        if node_count >= UNMAPPED as usize {
            return Err(GraphError::InvalidArgument(format!(
                "graph of {node_count} nodes exceeds the dense 32-bit id space"
            )));
        }

        let concurrency = if self.config.concurrency == 0 {
            pool.current_num_threads()
        } else {
            self.config.concurrency
        };
        let batch_size = adjust_batch_size(node_count, concurrency, self.config.batch_size);
        let ranges = id_map.batched_ranges(batch_size)?;
        debug!(
            node_count,
            concurrency,
            batch_size,
            ranges = ranges.len(),
            "starting adjacency import"
        );

        let shared_weights = Mutex::new(WeightMap::new(self.config.default_weight));
        let progress = AtomicU64::new(0);

        let blocks: Vec<RangeBlock> = pool.install(|| {
            ranges
                .into_par_iter()
                .map(|range| self.import_range(range, &id_map, source, &shared_weights, &progress))
                .collect::<Result<_>>()
        })?;

        let load_out = self.config.undirected || self.config.load_outgoing;
        let load_in = !self.config.undirected && self.config.load_incoming;
        let mut outgoing = load_out.then(|| Vec::with_capacity(node_count));
        let mut incoming = load_in.then(|| Vec::with_capacity(node_count));
        let mut total_entries = 0u64;
        let mut in_entries = 0u64;
        for block in blocks {
            if let (Some(all), Some(part)) = (outgoing.as_mut(), block.outgoing) {
                total_entries += part.iter().map(|l| l.targets.len() as u64).sum::<u64>();
                all.extend(part);
            }
            if let (Some(all), Some(part)) = (incoming.as_mut(), block.incoming) {
                in_entries += part.iter().map(|l| l.targets.len() as u64).sum::<u64>();
                all.extend(part);
            }
        }

        let relationship_count = if self.config.undirected {
            total_entries / 2
        } else if load_out {
            total_entries
        } else {
            in_entries
        };

        let matrix = AdjacencyMatrix::new(
            node_count,
            outgoing,
            incoming,
            self.config.effective_sort(),
        );
        let weights = shared_weights.into_inner();
        let partial = self.cancel.is_cancelled();
        info!(
            node_count,
            relationship_count,
            weights = weights.len(),
            partial,
            "adjacency import done"
        );
        Ok(Graph::new(id_map, matrix, weights, relationship_count, partial))
    }

    fn import_range<S: RelationshipSource>(
        &self,
        range: std::ops::Range<NodeId>,
        id_map: &IdMap,
        source: &S,
        shared_weights: &Mutex<WeightMap>,
        progress: &AtomicU64,
    ) -> Result<RangeBlock> {
        let config = &self.config;
        let len = range.len();
        let load_out = config.undirected || config.load_outgoing;
        let load_in = !config.undirected && config.load_incoming;

        let mut out_block = load_out.then(|| Vec::with_capacity(len));
        let mut in_block = load_in.then(|| Vec::with_capacity(len));
        let mut local_weights = config
            .load_weights
            .then(|| WeightMap::new(config.default_weight));
        let mut entries = 0u64;

        let (start, end) = (range.start, range.end);
        for node in range {
            if self.cancel.is_cancelled() {
                break;
            }
            let external = id_map.to_external(node);

            if let Some(block) = out_block.as_mut() {
                let directions: &[Direction] = if config.undirected {
                    &[Direction::Outgoing, Direction::Incoming]
                } else {
                    &[Direction::Outgoing]
                };
                let list = self.load_list(
                    node,
                    external,
                    directions,
                    false,
                    id_map,
                    source,
                    local_weights.as_mut(),
                )?;
                entries += list.targets.len() as u64;
                block.push(list);
            }
            if let Some(block) = in_block.as_mut() {
                let list = self.load_list(
                    node,
                    external,
                    &[Direction::Incoming],
                    true,
                    id_map,
                    source,
                    local_weights.as_mut(),
                )?;
                entries += list.targets.len() as u64;
                block.push(list);
            }
        }

        // A cancelled range leaves its remaining nodes as valid isolated
        // nodes so the stitched matrix stays well formed.
        if let Some(block) = out_block.as_mut() {
            block.resize_with(len, NodeList::default);
        }
        if let Some(block) = in_block.as_mut() {
            block.resize_with(len, NodeList::default);
        }

        if let Some(local) = local_weights {
            shared_weights.lock().merge_from(local);
        }
        let imported = progress.fetch_add(entries, Ordering::Relaxed) + entries;
        debug!(start, end, entries, imported, "imported node range");

        Ok(RangeBlock {
            outgoing: out_block,
            incoming: in_block,
        })
    }

    /// Runs the two-pass protocol for one node: arm at the exact degree,
    /// fill from the stream, then optionally sort and collapse.
    #[allow(clippy::too_many_arguments)]
    fn load_list<S: RelationshipSource>(
        &self,
        node: NodeId,
        external: StoreNodeId,
        directions: &[Direction],
        incoming: bool,
        id_map: &IdMap,
        source: &S,
        mut weights: Option<&mut WeightMap>,
    ) -> Result<NodeList> {
        let config = &self.config;
        let mut armed = 0usize;
        for &direction in directions {
            armed += source.degree(external, direction)?;
        }
        let mut collected: Vec<Entry> = Vec::with_capacity(armed);

        let mut enumerated = 0usize;
        for &direction in directions {
            source.for_each(external, direction, &mut |record| {
                enumerated += 1;
                let neighbor = id_map.to_internal(record.neighbor);
                if neighbor == UNMAPPED {
                    return;
                }
                collected.push(Entry {
                    neighbor,
                    rel: record.rel,
                    weight: record.weight,
                });
            })?;
        }
        if enumerated != armed {
            return Err(GraphError::DegreeMismatch {
                external,
                internal: node,
                armed,
                enumerated,
            });
        }

        if config.effective_sort() {
            collected.sort_unstable_by_key(|e| (e.neighbor, e.rel));
        }

        let weight_key = |neighbor: NodeId| {
            if incoming {
                pack_ids(neighbor, node)
            } else {
                pack_ids(node, neighbor)
            }
        };

        if config.merge_policy.collapses() {
            let mut kept: Vec<Entry> = Vec::with_capacity(collected.len());
            let mut group: Vec<Option<f64>> = Vec::new();
            let mut index = 0;
            while index < collected.len() {
                let first = collected[index];
                group.clear();
                while index < collected.len() && collected[index].neighbor == first.neighbor {
                    group.push(collected[index].weight);
                    index += 1;
                }
                let (source_id, target_id) = if incoming {
                    (first.neighbor, node)
                } else {
                    (node, first.neighbor)
                };
                let resolved =
                    resolve_duplicates(config.merge_policy, source_id, target_id, &group)?;
                if let (Some(map), Some(weight)) = (weights.as_deref_mut(), resolved) {
                    if weight != config.default_weight {
                        map.put(weight_key(first.neighbor), weight);
                    }
                }
                kept.push(first);
            }
            collected = kept;
        } else if let Some(map) = weights.as_deref_mut() {
            // No collapsing: duplicates keep their adjacency entries and
            // the map keeps the last weight in enumeration order.
            for entry in &collected {
                if let Some(weight) = entry.weight {
                    if weight != config.default_weight {
                        map.put(weight_key(entry.neighbor), weight);
                    }
                }
            }
        }

        Ok(NodeList {
            targets: collected.iter().map(|e| e.neighbor).collect(),
            rels: collected.iter().map(|e| e.rel).collect(),
        })
    }
}
