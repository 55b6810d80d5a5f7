//! Relationship expansion filter shared by traversals and path finders.

use smallvec::SmallVec;

use crate::model::*;
use crate::storage::GraphRead;
use crate::Result;

/// Ordered list of `(relationship type, direction)` pairs combined with OR.
/// An empty expander follows every relationship in both directions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expander {
    pairs: SmallVec<[(RelType, Direction); 4]>,
}

impl Expander {
    /// Follow every relationship, both directions.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_type(rel_type: impl Into<RelType>, dir: Direction) -> Self {
        Self::default().add(rel_type, dir)
    }

    pub fn add(mut self, rel_type: impl Into<RelType>, dir: Direction) -> Self {
        self.pairs.push((rel_type.into(), dir));
        self
    }

    /// Relationships leaving `node` under this filter, each paired with the
    /// node on its other end. Pairs are visited in declaration order,
    /// relationships within a pair in id order.
    pub fn expand<G: GraphRead>(&self, graph: &G, node: NodeId) -> Result<Vec<(Relationship, NodeId)>> {
        let rels = if self.pairs.is_empty() {
            graph.get_relationships(node, Direction::Both, &[])?
        } else {
            let mut rels = Vec::new();
            for (rel_type, dir) in &self.pairs {
                rels.extend(graph.get_relationships(node, *dir, std::slice::from_ref(rel_type))?);
            }
            rels
        };

        Ok(rels
            .into_iter()
            .filter_map(|rel| rel.other_node(node).map(|other| (rel, other)))
            .collect())
    }
}
