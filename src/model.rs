use serde::{Deserialize, Serialize};

/// Opaque 64-bit node identifier from the external store. Not required to
/// be dense or to start at zero.
pub type StoreNodeId = u64;

/// Dense internal node id in `[0, node_count)`.
pub type NodeId = u32;

/// Opaque relationship identifier from the external store.
pub type RelationshipId = u64;

/// Sentinel returned by id-map lookups for externals absent from the
/// graph view. Callers must branch on it explicitly; it is never a valid
/// internal id.
pub const UNMAPPED: NodeId = NodeId::MAX;

/// Traversal direction relative to a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// Packs two internal node ids into one 64-bit weight-map key, oriented
/// source -> target.
#[inline]
pub fn pack_ids(source: NodeId, target: NodeId) -> u64 {
    (u64::from(source) << 32) | u64::from(target)
}

/// Source half of a packed key.
#[inline]
pub fn packed_source(key: u64) -> NodeId {
    (key >> 32) as NodeId
}

/// Target half of a packed key.
#[inline]
pub fn packed_target(key: u64) -> NodeId {
    key as NodeId
}
