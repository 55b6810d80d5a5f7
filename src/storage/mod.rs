//! # Storage
//!
//! `GraphRead` is THE read contract between the graph state and everything
//! that walks it: index lookups, the traversal engine, and path finding all
//! take a `G: GraphRead`.
//!
//! ## Implementations
//!
//! | Type | Description |
//! |------|-------------|
//! | `GraphSnapshot` | Pinned, immutable view of one committed state |
//! | `GraphDatabase` | Live handle; every call reads the latest commit |
//!
//! Mutations never go through this trait. They are buffered in a
//! `Transaction` and applied to a copy of the state at commit.

pub mod memory;
pub mod snapshot;

use std::path::PathBuf;
use std::time::Duration;

use crate::model::*;
use crate::Result;

pub use memory::{GraphState, GraphSnapshot};

// ============================================================================
// Store Configuration
// ============================================================================

/// Where committed state lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// In-memory (no persistence)
    Memory,

    /// Snapshot file in `dir`, loaded on open and written on close.
    Persistent {
        dir: PathBuf,
    },
}

/// Configuration accepted by `GraphDatabase::open`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub mode: StorageMode,
    /// Persistent mode only: also write the snapshot after every commit.
    pub flush_on_commit: bool,
    /// How long `begin()` waits for the writer slot before `WriterBusy`.
    /// Zero fails immediately.
    pub writer_wait: Duration,
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self {
            mode: StorageMode::Memory,
            flush_on_commit: false,
            writer_wait: Duration::ZERO,
        }
    }

    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: StorageMode::Persistent { dir: dir.into() },
            ..Self::memory()
        }
    }

    pub fn with_flush_on_commit(mut self, flush: bool) -> Self {
        self.flush_on_commit = flush;
        self
    }

    pub fn with_writer_wait(mut self, wait: Duration) -> Self {
        self.writer_wait = wait;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::memory()
    }
}

// ============================================================================
// GraphRead Trait
// ============================================================================

/// Read access to committed graph state.
///
/// Unknown entity ids fail with `Error::NotFound`; a missing property on a
/// known entity is `Ok(None)`.
pub trait GraphRead {
    /// Get a node by ID.
    fn node(&self, id: NodeId) -> Result<Node>;

    /// Get a relationship by ID.
    fn relationship(&self, id: RelId) -> Result<Relationship>;

    fn contains_node(&self, id: NodeId) -> Result<bool>;

    /// Read one property. `None` means the entity exists but the key is unset.
    fn get_property(&self, entity: impl Into<EntityId>, key: &str) -> Result<Option<Value>>;

    fn has_property(&self, entity: impl Into<EntityId>, key: &str) -> Result<bool> {
        Ok(self.get_property(entity, key)?.is_some())
    }

    /// Relationships of `node` in `dir`, restricted to `types` (empty = any
    /// type), ordered by relationship id.
    fn get_relationships(
        &self,
        node: NodeId,
        dir: Direction,
        types: &[RelType],
    ) -> Result<Vec<Relationship>>;

    /// Raw entity ids under `(key, value)` in the named index, sorted.
    fn index_lookup(
        &self,
        kind: EntityKind,
        index: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<u64>>;

    /// Raw entity ids under `key` with any value in the named index, sorted.
    fn index_query(&self, kind: EntityKind, index: &str, key: &str) -> Result<Vec<u64>>;

    /// Total number of nodes.
    fn node_count(&self) -> Result<u64>;

    /// Total number of relationships.
    fn relationship_count(&self) -> Result<u64>;

    /// All node ids, ascending.
    fn all_node_ids(&self) -> Result<Vec<NodeId>>;

    /// All distinct relationship types in the graph, sorted.
    fn relationship_types(&self) -> Result<Vec<RelType>>;
}

impl<T: GraphRead> GraphRead for &T {
    fn node(&self, id: NodeId) -> Result<Node> { (**self).node(id) }

    fn relationship(&self, id: RelId) -> Result<Relationship> { (**self).relationship(id) }

    fn contains_node(&self, id: NodeId) -> Result<bool> { (**self).contains_node(id) }

    fn get_property(&self, entity: impl Into<EntityId>, key: &str) -> Result<Option<Value>> {
        (**self).get_property(entity, key)
    }

    fn get_relationships(
        &self,
        node: NodeId,
        dir: Direction,
        types: &[RelType],
    ) -> Result<Vec<Relationship>> {
        (**self).get_relationships(node, dir, types)
    }

    fn index_lookup(
        &self,
        kind: EntityKind,
        index: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<u64>> {
        (**self).index_lookup(kind, index, key, value)
    }

    fn index_query(&self, kind: EntityKind, index: &str, key: &str) -> Result<Vec<u64>> {
        (**self).index_query(kind, index, key)
    }

    fn node_count(&self) -> Result<u64> { (**self).node_count() }

    fn relationship_count(&self) -> Result<u64> { (**self).relationship_count() }

    fn all_node_ids(&self) -> Result<Vec<NodeId>> { (**self).all_node_ids() }

    fn relationship_types(&self) -> Result<Vec<RelType>> { (**self).relationship_types() }
}
