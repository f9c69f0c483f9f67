//! Sparse relationship weights and the duplicate-merge policy.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::model::{pack_ids, NodeId};

/// How duplicate relationships between the same ordered (source, target)
/// pair are resolved during construction.
///
/// Applied deterministically in ascending relationship-id order within
/// each node's neighbor list, regardless of how many workers built the
/// graph. Every policy except `None` requires sorted loading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MergePolicy {
    /// Keep duplicate entries as distinct relationships.
    #[default]
    None,
    /// Keep the first duplicate (smallest relationship id) and its weight.
    Skip,
    /// Collapse duplicates, summing their weights.
    Sum,
    /// Collapse duplicates, keeping the minimum weight.
    Min,
    /// Collapse duplicates, keeping the maximum weight.
    Max,
    /// Treat any duplicate as a build failure.
    Reject,
}

impl MergePolicy {
    /// Whether this policy collapses duplicate entries.
    pub fn collapses(self) -> bool {
        !matches!(self, MergePolicy::None)
    }

    /// Resolves the weight of a duplicate group. `existing` is the weight
    /// resolved so far (smallest relationship ids first).
    pub(crate) fn combine(self, existing: f64, incoming: f64) -> f64 {
        match self {
            MergePolicy::None | MergePolicy::Skip | MergePolicy::Reject => existing,
            MergePolicy::Sum => existing + incoming,
            MergePolicy::Min => existing.min(incoming),
            MergePolicy::Max => existing.max(incoming),
        }
    }
}

/// Sparse mapping from a packed (source, target) pair to a weight.
///
/// Absent keys resolve to a configurable default, so unweighted graphs
/// and missing properties cost nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMap {
    weights: HashMap<u64, f64>,
    default: f64,
}

impl WeightMap {
    pub fn new(default: f64) -> Self {
        Self {
            weights: HashMap::new(),
            default,
        }
    }

    /// The value returned for absent keys.
    pub fn default_weight(&self) -> f64 {
        self.default
    }

    /// Number of explicitly stored weights.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Resolved weight for a packed key; the default when absent.
    #[inline]
    pub fn get(&self, key: u64) -> f64 {
        self.weights.get(&key).copied().unwrap_or(self.default)
    }

    /// Resolved weight of the relationship `source -> target`.
    #[inline]
    pub fn between(&self, source: NodeId, target: NodeId) -> f64 {
        self.get(pack_ids(source, target))
    }

    pub fn contains(&self, key: u64) -> bool {
        self.weights.contains_key(&key)
    }

    /// Stores a weight, overwriting any previous value for the key.
    pub fn put(&mut self, key: u64, weight: f64) {
        self.weights.insert(key, weight);
    }

    /// Absorbs a worker-local map. Workers own disjoint node ranges, so
    /// colliding keys only occur when the same store relationship was
    /// seen from both of its endpoints, always with the same resolved
    /// value; a plain overwrite is deterministic.
    pub(crate) fn merge_from(&mut self, other: WeightMap) {
        if self.weights.is_empty() {
            self.weights = other.weights;
        } else {
            self.weights.extend(other.weights);
        }
    }
}

/// Resolves the weights of one duplicate group under `policy`.
///
/// `weights` are the optional per-entry weights of the group in ascending
/// relationship-id order. Returns the weight to store, if any.
pub(crate) fn resolve_duplicates(
    policy: MergePolicy,
    source: NodeId,
    target: NodeId,
    weights: &[Option<f64>],
) -> Result<Option<f64>> {
    if weights.len() > 1 && policy == MergePolicy::Reject {
        return Err(GraphError::DuplicateRelationship {
            source_node: source,
            target_node: target,
        });
    }
    // Skip keeps the first entry wholesale: later duplicates are dropped
    // even when the first one carries no weight and a later one does.
    if policy == MergePolicy::Skip {
        return Ok(weights.first().copied().flatten());
    }
    let mut resolved: Option<f64> = None;
    for weight in weights.iter().flatten() {
        resolved = Some(match resolved {
            None => *weight,
            Some(existing) => policy.combine(existing, *weight),
        });
    }
    Ok(resolved)
}
