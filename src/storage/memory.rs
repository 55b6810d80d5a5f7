//! In-memory graph state.
//!
//! `GraphState` is a plain value: nodes, relationships, adjacency lists and
//! property indexes in hash maps. It is never mutated once published. A
//! commit clones the latest state, applies the transaction's buffered
//! mutations to the clone, and swaps the result in; any failing mutation
//! discards the clone, so the published state is untouched.
//!
//! `GraphSnapshot` is an `Arc` over one published state and is what readers
//! hold for the duration of a lookup, traversal or path search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hashbrown::HashMap;

use crate::index::{IndexName, PropertyIndex};
use crate::model::*;
use crate::tx::Mutation;
use crate::{Error, Result};
use super::GraphRead;

// ============================================================================
// GraphState
// ============================================================================

/// One committed version of the graph.
#[derive(Debug, Clone, Default)]
pub struct GraphState {
    nodes: HashMap<NodeId, Node>,
    relationships: HashMap<RelId, Relationship>,
    /// node_id → relationship IDs touching it, ascending
    adjacency: HashMap<NodeId, Vec<RelId>>,
    indexes: HashMap<IndexName, PropertyIndex>,
}

impl GraphState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state (including adjacency) from stored parts.
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        relationships: Vec<Relationship>,
        indexes: Vec<(IndexName, PropertyIndex)>,
    ) -> Result<Self> {
        let mut state = Self::new();
        for node in nodes {
            state.adjacency.insert(node.id, Vec::new());
            state.nodes.insert(node.id, node);
        }
        for rel in relationships {
            state.insert_relationship(rel)?;
        }
        state.indexes = indexes.into_iter().collect();
        Ok(state)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.values()
    }

    pub fn indexes(&self) -> impl Iterator<Item = (&IndexName, &PropertyIndex)> {
        self.indexes.iter()
    }

    pub fn index_names(&self) -> Vec<IndexName> {
        let mut names: Vec<IndexName> = self.indexes.keys().cloned().collect();
        names.sort_by(|a, b| a.name.cmp(&b.name));
        names
    }

    fn entity_exists(&self, entity: EntityId) -> bool {
        match entity {
            EntityId::Node(id) => self.nodes.contains_key(&id),
            EntityId::Relationship(id) => self.relationships.contains_key(&id),
        }
    }

    fn properties_mut(&mut self, entity: EntityId) -> Result<&mut PropertyMap> {
        let props = match entity {
            EntityId::Node(id) => self.nodes.get_mut(&id).map(|n| &mut n.properties),
            EntityId::Relationship(id) => self.relationships.get_mut(&id).map(|r| &mut r.properties),
        };
        props.ok_or_else(|| Error::NotFound(entity.to_string()))
    }

    fn properties(&self, entity: EntityId) -> Result<&PropertyMap> {
        let props = match entity {
            EntityId::Node(id) => self.nodes.get(&id).map(|n| &n.properties),
            EntityId::Relationship(id) => self.relationships.get(&id).map(|r| &r.properties),
        };
        props.ok_or_else(|| Error::NotFound(entity.to_string()))
    }

    fn insert_relationship(&mut self, rel: Relationship) -> Result<()> {
        for endpoint in [rel.start, rel.end] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(Error::EndpointNotFound { relationship: rel.id, node: endpoint });
            }
        }

        let id = rel.id;
        let (start, end) = (rel.start, rel.end);
        self.relationships.insert(id, rel);

        // Update adjacency for both endpoints
        for endpoint in [start, end] {
            let rels = self.adjacency.entry(endpoint).or_default();
            let pos = rels.partition_point(|r| *r < id);
            if rels.get(pos) != Some(&id) {
                rels.insert(pos, id);
            }
        }
        Ok(())
    }

    fn remove_relationship(&mut self, id: RelId) -> Result<Relationship> {
        let rel = self.relationships.remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Relationship {id}")))?;
        for endpoint in [rel.start, rel.end] {
            if let Some(rels) = self.adjacency.get_mut(&endpoint) {
                rels.retain(|rid| *rid != id);
            }
        }
        self.purge_index_entries(EntityId::Relationship(id));
        Ok(rel)
    }

    fn remove_node(&mut self, id: NodeId) -> Result<()> {
        if let Some(rels) = self.adjacency.get(&id) {
            if !rels.is_empty() {
                return Err(Error::ConstraintViolation(format!(
                    "Cannot delete node {id} with {} relationships. Delete relationships first.",
                    rels.len()
                )));
            }
        }
        self.nodes.remove(&id).ok_or_else(|| Error::NotFound(format!("Node {id}")))?;
        self.adjacency.remove(&id);
        self.purge_index_entries(EntityId::Node(id));
        Ok(())
    }

    fn purge_index_entries(&mut self, entity: EntityId) {
        for (name, index) in self.indexes.iter_mut() {
            if name.kind == entity.kind() {
                index.remove_entity(entity.raw());
            }
        }
        self.indexes.retain(|_, index| !index.is_empty());
    }

    fn check_index_entity(index: &IndexName, entity: EntityId) -> Result<()> {
        if index.kind != entity.kind() {
            return Err(Error::NotFound(format!(
                "{entity} cannot be stored in {:?} index '{}'",
                index.kind, index.name
            )));
        }
        Ok(())
    }

    /// Apply one buffered mutation.
    pub(crate) fn apply(&mut self, mutation: Mutation) -> Result<()> {
        match mutation {
            Mutation::CreateNode(id) => {
                self.nodes.insert(id, Node::new(id));
                self.adjacency.insert(id, Vec::new());
            }
            Mutation::CreateRelationship { id, start, end, rel_type } => {
                self.insert_relationship(Relationship::new(id, start, end, rel_type))?;
            }
            Mutation::SetProperty { entity, key, value } => {
                self.properties_mut(entity)?.insert(key, value);
            }
            Mutation::RemoveProperty { entity, key } => {
                self.properties_mut(entity)?.remove(&key);
            }
            Mutation::DeleteNode(id) => self.remove_node(id)?,
            Mutation::DetachDeleteNode(id) => {
                if !self.nodes.contains_key(&id) {
                    return Err(Error::NotFound(format!("Node {id}")));
                }
                let rels = self.adjacency.get(&id).cloned().unwrap_or_default();
                for rid in rels {
                    self.remove_relationship(rid)?;
                }
                self.remove_node(id)?;
            }
            Mutation::DeleteRelationship(id) => {
                self.remove_relationship(id)?;
            }
            Mutation::IndexAdd { index, entity, key, value } => {
                Self::check_index_entity(&index, entity)?;
                if !self.entity_exists(entity) {
                    return Err(Error::NotFound(format!("{entity} (index '{}')", index.name)));
                }
                self.indexes.entry(index).or_default().add(&key, &value, entity.raw());
            }
            Mutation::IndexRemove { index, entity, key, value } => {
                Self::check_index_entity(&index, entity)?;
                if let Some(idx) = self.indexes.get_mut(&index) {
                    idx.remove(&key, &value, entity.raw());
                    if idx.is_empty() {
                        self.indexes.remove(&index);
                    }
                }
            }
            Mutation::IndexRemoveEntity { index, entity } => {
                Self::check_index_entity(&index, entity)?;
                if let Some(idx) = self.indexes.get_mut(&index) {
                    idx.remove_entity(entity.raw());
                    if idx.is_empty() {
                        self.indexes.remove(&index);
                    }
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Reads
// ============================================================================

impl GraphRead for GraphState {
    fn node(&self, id: NodeId) -> Result<Node> {
        self.nodes.get(&id).cloned().ok_or_else(|| Error::NotFound(format!("Node {id}")))
    }

    fn relationship(&self, id: RelId) -> Result<Relationship> {
        self.relationships.get(&id).cloned()
            .ok_or_else(|| Error::NotFound(format!("Relationship {id}")))
    }

    fn contains_node(&self, id: NodeId) -> Result<bool> {
        Ok(self.nodes.contains_key(&id))
    }

    fn get_property(&self, entity: impl Into<EntityId>, key: &str) -> Result<Option<Value>> {
        Ok(self.properties(entity.into())?.get(key).cloned())
    }

    fn get_relationships(
        &self,
        node: NodeId,
        dir: Direction,
        types: &[RelType],
    ) -> Result<Vec<Relationship>> {
        let rel_ids = self.adjacency.get(&node)
            .ok_or_else(|| Error::NotFound(format!("Node {node}")))?;

        let mut result = Vec::new();
        for rid in rel_ids {
            if let Some(rel) = self.relationships.get(rid) {
                // Direction filter
                let matches_dir = rel.matches_direction(node, dir);
                // Type filter
                let matches_type = types.is_empty() || types.contains(&rel.rel_type);

                if matches_dir && matches_type {
                    result.push(rel.clone());
                }
            }
        }
        Ok(result)
    }

    fn index_lookup(
        &self,
        kind: EntityKind,
        index: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<u64>> {
        Ok(self.indexes
            .get(&IndexName::new(kind, index))
            .map(|idx| idx.get(key, value))
            .unwrap_or_default())
    }

    fn index_query(&self, kind: EntityKind, index: &str, key: &str) -> Result<Vec<u64>> {
        Ok(self.indexes
            .get(&IndexName::new(kind, index))
            .map(|idx| idx.query(key))
            .unwrap_or_default())
    }

    fn node_count(&self) -> Result<u64> {
        Ok(self.nodes.len() as u64)
    }

    fn relationship_count(&self) -> Result<u64> {
        Ok(self.relationships.len() as u64)
    }

    fn all_node_ids(&self) -> Result<Vec<NodeId>> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn relationship_types(&self) -> Result<Vec<RelType>> {
        let mut types: Vec<RelType> = self.relationships.values().map(|r| r.rel_type.clone()).collect();
        types.sort();
        types.dedup();
        Ok(types)
    }
}

// ============================================================================
// GraphSnapshot
// ============================================================================

/// A pinned committed state. Cheap to clone; never changes.
///
/// Shares the store's closed flag: once the store is closed every read
/// through a snapshot fails with `StoreClosed`, even if it was taken before.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    state: Arc<GraphState>,
    closed: Arc<AtomicBool>,
}

impl GraphSnapshot {
    pub(crate) fn new(state: Arc<GraphState>, closed: Arc<AtomicBool>) -> Self {
        Self { state, closed }
    }

    /// The pinned state, if the store is still open.
    pub fn state(&self) -> Result<&GraphState> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::StoreClosed);
        }
        Ok(&self.state)
    }

    pub fn index_names(&self) -> Result<Vec<IndexName>> {
        Ok(self.state()?.index_names())
    }
}

impl GraphRead for GraphSnapshot {
    fn node(&self, id: NodeId) -> Result<Node> { self.state()?.node(id) }

    fn relationship(&self, id: RelId) -> Result<Relationship> { self.state()?.relationship(id) }

    fn contains_node(&self, id: NodeId) -> Result<bool> { self.state()?.contains_node(id) }

    fn get_property(&self, entity: impl Into<EntityId>, key: &str) -> Result<Option<Value>> {
        self.state()?.get_property(entity, key)
    }

    fn get_relationships(
        &self,
        node: NodeId,
        dir: Direction,
        types: &[RelType],
    ) -> Result<Vec<Relationship>> {
        self.state()?.get_relationships(node, dir, types)
    }

    fn index_lookup(
        &self,
        kind: EntityKind,
        index: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<u64>> {
        self.state()?.index_lookup(kind, index, key, value)
    }

    fn index_query(&self, kind: EntityKind, index: &str, key: &str) -> Result<Vec<u64>> {
        self.state()?.index_query(kind, index, key)
    }

    fn node_count(&self) -> Result<u64> { self.state()?.node_count() }

    fn relationship_count(&self) -> Result<u64> { self.state()?.relationship_count() }

    fn all_node_ids(&self) -> Result<Vec<NodeId>> { self.state()?.all_node_ids() }

    fn relationship_types(&self) -> Result<Vec<RelType>> { self.state()?.relationship_types() }
}

// ============================================================================
// Tests
// ============================================================================
