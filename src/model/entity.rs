//! Entity references — properties and index entries address either kind.

use serde::{Deserialize, Serialize};
use super::{NodeId, RelId};

/// Which kind of entity an id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Node,
    Relationship,
}

/// A node or relationship id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityId {
    Node(NodeId),
    Relationship(RelId),
}

impl EntityId {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityId::Node(_) => EntityKind::Node,
            EntityId::Relationship(_) => EntityKind::Relationship,
        }
    }

    pub(crate) fn raw(&self) -> u64 {
        match self {
            EntityId::Node(id) => id.0,
            EntityId::Relationship(id) => id.0,
        }
    }
}

impl From<NodeId> for EntityId {
    fn from(id: NodeId) -> Self { EntityId::Node(id) }
}

impl From<RelId> for EntityId {
    fn from(id: RelId) -> Self { EntityId::Relationship(id) }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityId::Node(id) => write!(f, "Node {id}"),
            EntityId::Relationship(id) => write!(f, "Relationship {id}"),
        }
    }
}

/// Id types that can be stored in a typed index (`Index<NodeId>`,
/// `Index<RelId>`).
pub trait IndexEntity: Copy + Into<EntityId> + sealed::Sealed {
    const KIND: EntityKind;
    fn from_raw(raw: u64) -> Self;
}

impl IndexEntity for NodeId {
    const KIND: EntityKind = EntityKind::Node;
    fn from_raw(raw: u64) -> Self { NodeId(raw) }
}

impl IndexEntity for RelId {
    const KIND: EntityKind = EntityKind::Relationship;
    fn from_raw(raw: u64) -> Self { RelId(raw) }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::NodeId {}
    impl Sealed for super::RelId {}
}
