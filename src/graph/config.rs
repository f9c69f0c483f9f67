//! Graph construction options.
//!
//! # Presets
//!
//! - [`GraphConfig::default()`] - directed, both directions, unsorted
//! - [`GraphConfig::undirected()`] - symmetric loading, sorted lists
//! - [`GraphConfig::weighted(default)`] - directed with weight loading
//!
//! # Example
//!
//! ```rust
//! use selva::{GraphConfig, MergePolicy};
//!
//! let mut config = GraphConfig::undirected();
//! config.merge_policy = MergePolicy::Sum;
//! config.load_weights = true;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::graph::MergePolicy;
use crate::util::DEFAULT_BATCH_SIZE;

/// Options controlling how a graph view is materialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Number of import workers. Zero means "use every thread of the
    /// pool handed to the builder".
    pub concurrency: usize,

    /// Upper bound on nodes per worker range. The effective range size
    /// shrinks so that roughly `concurrency` ranges cover the id space.
    pub batch_size: usize,

    /// Load per-node outgoing neighbor lists.
    pub load_outgoing: bool,

    /// Load per-node incoming neighbor lists.
    pub load_incoming: bool,

    /// Treat relationships as symmetric: both directions of every
    /// relationship merge into a single sorted outgoing list per node,
    /// and no separate incoming lists are stored.
    pub undirected: bool,

    /// Sort each neighbor list by `(target, relationship id)` after the
    /// fill and collapse duplicates per [`merge_policy`](Self::merge_policy).
    pub sort: bool,

    /// How duplicate relationships between the same ordered pair are
    /// resolved. Policies other than [`MergePolicy::None`] require
    /// `sort` (collapse needs adjacency).
    pub merge_policy: MergePolicy,

    /// Fill a weight map from the source's weight property.
    pub load_weights: bool,

    /// Weight reported for relationships without a stored weight.
    pub default_weight: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            load_outgoing: true,
            load_incoming: true,
            undirected: false,
            sort: false,
            merge_policy: MergePolicy::None,
            load_weights: false,
            default_weight: 0.0,
        }
    }
}

impl GraphConfig {
    /// Symmetric loading with sorted, deduplicated lists.
    pub fn undirected() -> Self {
        Self {
            undirected: true,
            sort: true,
            merge_policy: MergePolicy::Skip,
            ..Self::default()
        }
    }

    /// Directed loading with weights resolved against `default_weight`.
    pub fn weighted(default_weight: f64) -> Self {
        Self {
            load_weights: true,
            default_weight,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(GraphError::InvalidArgument(
                "batch size must be positive".into(),
            ));
        }
        if !self.undirected && !self.load_outgoing && !self.load_incoming {
            return Err(GraphError::InvalidArgument(
                "at least one direction must be loaded".into(),
            ));
        }
        if self.merge_policy.collapses() && !self.effective_sort() {
            return Err(GraphError::InvalidArgument(
                "merge policy requires sorted loading".into(),
            ));
        }
        Ok(())
    }

    /// Undirected loading always sorts; duplicate halves of symmetric
    /// relationships could not collapse otherwise.
    pub(crate) fn effective_sort(&self) -> bool {
        self.sort || self.undirected
    }
}
