//! Error handling for selva operations.
//!
//! All public APIs return `Result<T, GraphError>`. The taxonomy follows
//! the construction protocol: store-read failures and two-pass protocol
//! violations are fatal to a build, while lookup misses and cooperative
//! cancellation are ordinary control flow and never surface here.

use thiserror::Error;

use crate::model::{NodeId, StoreNodeId};

/// Result type for selva operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while materializing or traversing a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The external relationship source failed during a degree query or
    /// a neighbor enumeration.
    ///
    /// Fatal to the current build: no partial graph is returned.
    #[error("store read failed: {0}")]
    StoreRead(String),

    /// The external source reported a degree at arming time that differs
    /// from what enumeration actually yielded.
    ///
    /// Neighbor arrays are exactly sized and cannot grow, so this is a
    /// consistency violation of the two-pass protocol.
    #[error("degree mismatch for node {external} (internal {internal}): armed {armed}, enumerated {enumerated}")]
    DegreeMismatch {
        /// External id of the offending node.
        external: StoreNodeId,
        /// Internal id of the offending node.
        internal: NodeId,
        /// Degree reported by the source during arming.
        armed: usize,
        /// Number of relationships the enumeration actually produced.
        enumerated: usize,
    },

    /// A duplicate (source, target) relationship was found while the
    /// merge policy is [`MergePolicy::Reject`](crate::graph::MergePolicy).
    ///
    /// Under every other policy duplicates are resolved, not reported.
    #[error("duplicate relationship {source_node} -> {target_node} rejected by merge policy")]
    DuplicateRelationship {
        /// Internal source node id.
        source_node: NodeId,
        /// Internal target node id.
        target_node: NodeId,
    },

    /// Invalid configuration or argument.
    ///
    /// Raised for zero batch sizes, graphs exceeding the dense 32-bit id
    /// space, source nodes outside `[0, node_count)`, or a collapsing
    /// merge policy configured without sorted loading.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
