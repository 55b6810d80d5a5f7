//! Relationship (edge) in the property graph.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use super::{NodeId, PropertyMap, Value};

/// Opaque relationship identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelId(pub u64);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Relationship type tag, e.g. `KNOWS`.
///
/// Declare application types as constants:
///
/// ```
/// use graphdb_embedded::RelType;
/// const KNOWS: RelType = RelType::from_static("KNOWS");
/// assert_eq!(KNOWS.name(), "KNOWS");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelType(Cow<'static, str>);

impl RelType {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for RelType {
    fn from(name: &'static str) -> Self { Self::from_static(name) }
}

impl From<String> for RelType {
    fn from(name: String) -> Self { Self::new(name) }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Traversal direction, relative to the node being expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A relationship (directed edge) in the property graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelId,
    pub start: NodeId,
    pub end: NodeId,
    pub rel_type: RelType,
    pub properties: PropertyMap,
}

impl Relationship {
    pub fn new(id: RelId, start: NodeId, end: NodeId, rel_type: RelType) -> Self {
        Self {
            id,
            start,
            end,
            rel_type,
            properties: PropertyMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// The "other" end of the relationship from the given node.
    pub fn other_node(&self, from: NodeId) -> Option<NodeId> {
        if from == self.start { Some(self.end) }
        else if from == self.end { Some(self.start) }
        else { None }
    }

    /// Whether this relationship is visible from `node` in direction `dir`.
    pub fn matches_direction(&self, node: NodeId, dir: Direction) -> bool {
        match dir {
            Direction::Outgoing => self.start == node,
            Direction::Incoming => self.end == node,
            Direction::Both => self.start == node || self.end == node,
        }
    }
}
