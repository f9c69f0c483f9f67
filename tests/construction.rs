//! End-to-end tests for graph materialization: id mapping, parallel
//! import, merge policies, weights, and failure modes.

use proptest::prelude::*;

use selva::{
    Direction, GraphBuilder, GraphConfig, GraphError, InMemorySource, MergePolicy,
    RelationshipRecord, RelationshipSource, Result, StoreNodeId, UNMAPPED,
};

fn pool(threads: usize) -> rayon::ThreadPool {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .unwrap()
}

fn build(config: GraphConfig, nodes: std::ops::Range<u64>, source: &InMemorySource) -> selva::Graph {
    GraphBuilder::new(config).build(nodes, source, &pool(2)).unwrap()
}

#[test]
fn empty_universe_builds_an_empty_graph() {
    let graph = build(GraphConfig::default(), 0..0, &InMemorySource::new());
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.relationship_count(), 0);
    assert!(!graph.is_partial());
}

#[test]
fn internal_ids_are_dense_and_ascending() {
    let source = InMemorySource::from_edges(&[(10, 3), (3, 7)]);
    let graph = GraphBuilder::new(GraphConfig::default())
        .build([10u64, 3, 7], &source, &pool(2))
        .unwrap();
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.to_internal(3), 0);
    assert_eq!(graph.to_internal(7), 1);
    assert_eq!(graph.to_internal(10), 2);
    assert_eq!(graph.to_external(2), 10);
    assert_eq!(graph.to_internal(99), UNMAPPED);

    // 10 -> 3 becomes internal 2 -> 0.
    assert!(graph.has_edge(2, 0, Direction::Outgoing));
    assert!(graph.has_edge(0, 1, Direction::Outgoing));
    assert!(!graph.has_edge(0, 2, Direction::Outgoing));
}

#[test]
fn degree_sums_match_relationship_count() {
    let source = InMemorySource::from_edges(&[(0, 1), (0, 2), (1, 2), (3, 0), (3, 3)]);
    let graph = build(GraphConfig::default(), 0..4, &source);

    assert_eq!(graph.relationship_count(), 5);
    let out_sum: usize = (0..4).map(|n| graph.degree(n, Direction::Outgoing)).sum();
    let in_sum: usize = (0..4).map(|n| graph.degree(n, Direction::Incoming)).sum();
    assert_eq!(out_sum, 5);
    assert_eq!(in_sum, 5);
}

#[test]
fn undirected_merges_both_directions() {
    let source = InMemorySource::from_edges(&[(0, 1), (1, 2), (3, 1)]);
    let graph = build(GraphConfig::undirected(), 0..4, &source);

    assert_eq!(graph.relationship_count(), 3);
    assert_eq!(graph.degree(1, Direction::Outgoing), 3);
    let sum: usize = (0..4).map(|n| graph.degree(n, Direction::Outgoing)).sum();
    assert_eq!(sum, 6);

    // Every edge is visible from both endpoints.
    assert!(graph.has_edge(0, 1, Direction::Outgoing));
    assert!(graph.has_edge(1, 0, Direction::Outgoing));
    assert!(graph.has_edge(1, 3, Direction::Outgoing));
}

#[test]
fn isolated_nodes_are_loaded_with_zero_degree() {
    let source = InMemorySource::from_edges(&[(0, 1)]);
    let graph = build(GraphConfig::default(), 0..5, &source);

    assert_eq!(graph.node_count(), 5);
    for n in 2..5 {
        assert_eq!(graph.degree(n, Direction::Outgoing), 0);
        assert_eq!(graph.degree(n, Direction::Incoming), 0);
        assert_eq!(graph.neighbors(n, Direction::Outgoing).count(), 0);
    }
}

#[test]
fn relationships_to_unmapped_externals_are_skipped() {
    let source = InMemorySource::from_edges(&[(0, 1), (0, 99), (99, 1)]);
    let graph = build(GraphConfig::default(), 0..2, &source);

    assert_eq!(graph.relationship_count(), 1);
    assert_eq!(graph.degree(0, Direction::Outgoing), 1);
    assert_eq!(graph.degree(1, Direction::Incoming), 1);
    assert_eq!(graph.neighbors(0, Direction::Outgoing).collect::<Vec<_>>(), vec![1]);
}

#[test]
fn construction_is_deterministic_across_pool_sizes() {
    let mut source = InMemorySource::new();
    for s in 0..200u64 {
        source.add_weighted(s, (s * 7 + 3) % 200, s as f64);
        source.add(s, (s * 13 + 1) % 200);
    }
    let mut config = GraphConfig::weighted(1.0);
    config.sort = true;
    config.batch_size = 16;

    let sequential = GraphBuilder::new(config.clone())
        .build(0..200, &source, &pool(1))
        .unwrap();
    let parallel = GraphBuilder::new(config)
        .build(0..200, &source, &pool(4))
        .unwrap();
    assert_eq!(sequential, parallel);
}

/// Wraps an edge-list source and inflates the degree it reports for one
/// node, simulating a store whose count and stream disagree.
struct LyingSource {
    inner: InMemorySource,
    liar: StoreNodeId,
}

impl RelationshipSource for LyingSource {
    fn degree(&self, node: StoreNodeId, direction: Direction) -> Result<usize> {
        let d = self.inner.degree(node, direction)?;
        Ok(if node == self.liar { d + 1 } else { d })
    }

    fn for_each(
        &self,
        node: StoreNodeId,
        direction: Direction,
        visit: &mut dyn FnMut(RelationshipRecord),
    ) -> Result<()> {
        self.inner.for_each(node, direction, visit)
    }
}

#[test]
fn degree_mismatch_aborts_the_build() {
    let source = LyingSource {
        inner: InMemorySource::from_edges(&[(0, 1), (1, 0)]),
        liar: 1,
    };
    let err = GraphBuilder::new(GraphConfig::default())
        .build(0..2, &source, &pool(2))
        .unwrap_err();
    match err {
        GraphError::DegreeMismatch {
            external,
            armed,
            enumerated,
            ..
        } => {
            assert_eq!(external, 1);
            assert_eq!(armed, 2);
            assert_eq!(enumerated, 1);
        }
        other => panic!("expected DegreeMismatch, got {other:?}"),
    }
}

/// Fails every degree query, simulating an unreadable store.
struct FailingSource;

impl RelationshipSource for FailingSource {
    fn degree(&self, _node: StoreNodeId, _direction: Direction) -> Result<usize> {
        Err(GraphError::StoreRead("connection reset".into()))
    }

    fn for_each(
        &self,
        _node: StoreNodeId,
        _direction: Direction,
        _visit: &mut dyn FnMut(RelationshipRecord),
    ) -> Result<()> {
        Ok(())
    }
}

#[test]
fn store_read_failure_aborts_the_build() {
    let err = GraphBuilder::new(GraphConfig::default())
        .build(0..3, &FailingSource, &pool(2))
        .unwrap_err();
    assert!(matches!(err, GraphError::StoreRead(_)));
}

fn duplicate_source() -> InMemorySource {
    let mut source = InMemorySource::new();
    source.add_weighted(0, 1, 2.0);
    source.add_weighted(0, 1, 5.0);
    source.add_weighted(0, 2, 3.0);
    source
}

fn merge_config(policy: MergePolicy) -> GraphConfig {
    let mut config = GraphConfig::weighted(0.0);
    config.sort = true;
    config.merge_policy = policy;
    config.load_incoming = false;
    config
}

#[test]
fn merge_policy_skip_keeps_the_first_relationship() {
    let graph = build(merge_config(MergePolicy::Skip), 0..3, &duplicate_source());
    assert_eq!(graph.degree(0, Direction::Outgoing), 2);
    assert_eq!(graph.relationship_count(), 2);
    assert_eq!(graph.weight(0, 1), 2.0);
}

#[test]
fn merge_policy_sum_accumulates_weights() {
    let graph = build(merge_config(MergePolicy::Sum), 0..3, &duplicate_source());
    assert_eq!(graph.degree(0, Direction::Outgoing), 2);
    assert_eq!(graph.weight(0, 1), 7.0);
    assert_eq!(graph.weight(0, 2), 3.0);
}

#[test]
fn merge_policy_min_and_max_pick_extremes() {
    let min = build(merge_config(MergePolicy::Min), 0..3, &duplicate_source());
    assert_eq!(min.weight(0, 1), 2.0);
    let max = build(merge_config(MergePolicy::Max), 0..3, &duplicate_source());
    assert_eq!(max.weight(0, 1), 5.0);
}

#[test]
fn merge_policy_reject_fails_on_duplicates() {
    let err = GraphBuilder::new(merge_config(MergePolicy::Reject))
        .build(0..3, &duplicate_source(), &pool(2))
        .unwrap_err();
    assert!(matches!(
        err,
        GraphError::DuplicateRelationship {
            source_node: 0,
            target_node: 1,
        }
    ));
    assert_eq!(
        err.to_string(),
        "duplicate relationship 0 -> 1 rejected by merge policy"
    );
}

#[test]
fn merge_policy_skip_drops_later_weights_entirely() {
    // The first duplicate carries no weight; Skip must not fall through
    // to a later duplicate's weight.
    let mut source = InMemorySource::new();
    source.add(0, 1);
    source.add_weighted(0, 1, 5.0);
    let graph = build(merge_config(MergePolicy::Skip), 0..2, &source);
    assert_eq!(graph.degree(0, Direction::Outgoing), 1);
    assert_eq!(graph.weight(0, 1), 0.0);
}

#[test]
fn merge_policy_none_keeps_parallel_relationships() {
    let mut config = merge_config(MergePolicy::None);
    config.sort = false;
    let graph = build(config, 0..3, &duplicate_source());
    assert_eq!(graph.degree(0, Direction::Outgoing), 3);
    assert_eq!(graph.relationship_count(), 3);
    // Without collapse the last write wins.
    assert_eq!(graph.weight(0, 1), 5.0);
}

#[test]
fn collapsing_policy_without_sort_is_rejected() {
    let mut config = GraphConfig::default();
    config.merge_policy = MergePolicy::Sum;
    let err = GraphBuilder::new(config)
        .build(0..2, &InMemorySource::new(), &pool(1))
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidArgument(_)));
}

#[test]
fn missing_weights_fall_back_to_the_default() {
    let mut source = InMemorySource::new();
    source.add(0, 1);
    source.add_weighted(0, 2, 4.5);
    let graph = build(GraphConfig::weighted(1.5), 0..3, &source);

    assert_eq!(graph.weight(0, 1), 1.5);
    assert_eq!(graph.weight(0, 2), 4.5);
    assert_eq!(graph.weight(1, 2), 1.5);
}

#[test]
fn sorted_lists_answer_has_edge_by_binary_search() {
    let mut config = GraphConfig::default();
    config.sort = true;
    let mut source = InMemorySource::new();
    for t in (0..100u64).rev() {
        source.add(100, t);
    }
    let graph = build(config, 0..101, &source);

    assert!(graph.matrix().is_sorted());
    let targets: Vec<_> = graph.neighbors(100, Direction::Outgoing).collect();
    assert!(targets.windows(2).all(|w| w[0] < w[1]));
    assert!(graph.has_edge(100, 42, Direction::Outgoing));
    assert!(!graph.has_edge(42, 100, Direction::Outgoing));
}

#[test]
fn cancelled_build_yields_a_partial_graph() {
    let cancel = selva::CancelFlag::new();
    cancel.cancel();
    let source = InMemorySource::from_edges(&[(0, 1), (1, 2)]);
    let graph = GraphBuilder::new(GraphConfig::default())
        .with_cancel_flag(cancel)
        .build(0..3, &source, &pool(2))
        .unwrap();

    assert!(graph.is_partial());
    assert_eq!(graph.node_count(), 3);
    for n in 0..3 {
        assert_eq!(graph.degree(n, Direction::Outgoing), 0);
    }
}

proptest! {
    /// Directed loading preserves every mapped edge and nothing else.
    #[test]
    fn directed_load_preserves_edges(
        edges in prop::collection::vec((0u64..30, 0u64..30), 0..120),
        threads in 1usize..5,
    ) {
        let mut source = InMemorySource::new();
        for &(s, t) in &edges {
            source.add(s, t);
        }
        let graph = GraphBuilder::new(GraphConfig::default())
            .build(0..30, &source, &pool(threads))
            .unwrap();

        prop_assert_eq!(graph.relationship_count(), edges.len() as u64);
        for &(s, t) in &edges {
            let (s, t) = (graph.to_internal(s), graph.to_internal(t));
            prop_assert!(graph.has_edge(s, t, Direction::Outgoing));
            prop_assert!(graph.has_edge(t, s, Direction::Incoming));
        }
        let out_sum: usize = (0..30).map(|n| graph.degree(n, Direction::Outgoing)).sum();
        let in_sum: usize = (0..30).map(|n| graph.degree(n, Direction::Incoming)).sum();
        prop_assert_eq!(out_sum, edges.len());
        prop_assert_eq!(in_sum, edges.len());
    }
}
