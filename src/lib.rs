//! # graphdb-embedded — Embedded Property Graph Store
//!
//! An in-process property graph: nodes and typed, directed relationships
//! carrying key/value properties, with transactional writes, property
//! indexes, breadth/depth-first traversals and shortest-path search.
//!
//! ## Design Principles
//!
//! 1. **Trait-first reads**: `GraphRead` is the contract between the store and
//!    everything that walks it (indexes, traversals, path finding)
//! 2. **Clean DTOs**: `Node`, `Relationship`, `Value`, `Path` cross all boundaries
//! 3. **Snapshot isolation**: readers pin an immutable committed state; a
//!    commit publishes a new one in a single swap
//! 4. **Single writer**: one `Transaction` at a time buffers all mutations,
//!    including index changes, and applies them atomically
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graphdb_embedded::{GraphDatabase, GraphRead, NodeId, StoreConfig, Value};
//!
//! # fn example() -> graphdb_embedded::Result<()> {
//! let db = GraphDatabase::open(StoreConfig::memory())?;
//! let people = db.node_index("people");
//!
//! let mut tx = db.begin()?;
//! let ada = tx.create_node()?;
//! tx.set_property(ada, "name", "Ada")?;
//! people.add(&mut tx, ada, "name", "Ada")?;
//! tx.success();
//! tx.finish()?;
//!
//! let found: NodeId = people.get_single(&db, "name", "Ada")?;
//! assert_eq!(db.get_property(found, "name")?, Some(Value::from("Ada")));
//! db.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Modes
//!
//! | Mode | Description |
//! |------|-------------|
//! | `Memory` | Nothing touches disk |
//! | `Persistent { dir }` | JSON snapshot loaded on open, written on close |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod storage;
pub mod tx;
pub mod index;
pub mod traversal;
pub mod algo;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::storage::snapshot;
use crate::tx::Mutation;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, Relationship, Path, Value, PropertyMap, properties,
    NodeId, RelId, RelType, Direction, EntityId, EntityKind,
};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{GraphRead, GraphSnapshot, GraphState, StoreConfig, StorageMode};

// ============================================================================
// Re-exports: Transactions, Indexes, Traversal, Algorithms
// ============================================================================

pub use tx::{Transaction, TxId, TxState};
pub use index::{Index, IndexName};
pub use traversal::{Evaluator, Expander, Order, Position, TraversalDescription, Traverser};
pub use algo::PathFinder;

// ============================================================================
// Top-level database handle
// ============================================================================

/// The primary entry point. Cheap to clone; all clones share one store.
///
/// Reads through the handle itself always see the latest commit. Use
/// `snapshot()` to pin one committed state across several reads.
#[derive(Clone)]
pub struct GraphDatabase {
    inner: Arc<DatabaseInner>,
}

impl GraphDatabase {
    /// Open a store. In persistent mode the directory is created if needed
    /// and an existing snapshot is loaded.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let (state, next_node_id, next_rel_id) = match &config.mode {
            StorageMode::Memory => (GraphState::new(), 1, 1),
            StorageMode::Persistent { dir } => {
                std::fs::create_dir_all(dir)?;
                match snapshot::load(dir)? {
                    Some(restored) => {
                        let max_node = restored.state.nodes().map(|n| n.id.0).max().unwrap_or(0);
                        let max_rel = restored.state.relationships().map(|r| r.id.0).max().unwrap_or(0);
                        (
                            restored.state,
                            restored.next_node_id.max(max_node + 1),
                            restored.next_rel_id.max(max_rel + 1),
                        )
                    }
                    None => (GraphState::new(), 1, 1),
                }
            }
        };

        info!(mode = ?config.mode, nodes = state.nodes().count(), "graph store opened");
        Ok(Self {
            inner: Arc::new(DatabaseInner {
                config,
                committed: RwLock::new(Arc::new(state)),
                writer: Mutex::new(()),
                persist: Mutex::new(()),
                closed: Arc::new(AtomicBool::new(false)),
                next_node_id: AtomicU64::new(next_node_id),
                next_rel_id: AtomicU64::new(next_rel_id),
                next_tx_id: AtomicU64::new(1),
            }),
        })
    }

    /// In-memory store with default settings.
    pub fn open_in_memory() -> Result<Self> {
        Self::open(StoreConfig::memory())
    }

    /// Begin the write transaction. Fails with `WriterBusy` if another
    /// transaction still holds the writer slot after `writer_wait`.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        self.ensure_open()?;
        let wait = self.inner.config.writer_wait;
        let guard = if wait.is_zero() {
            self.inner.writer.try_lock()
        } else {
            self.inner.writer.try_lock_for(wait)
        };
        let guard = guard.ok_or(Error::WriterBusy)?;

        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        debug!(tx = %id, "transaction started");
        Ok(Transaction::new(id, &self.inner, guard))
    }

    /// Pin the latest committed state.
    pub fn snapshot(&self) -> Result<GraphSnapshot> {
        self.ensure_open()?;
        Ok(GraphSnapshot::new(
            Arc::clone(&self.inner.committed.read()),
            Arc::clone(&self.inner.closed),
        ))
    }

    /// Handle to the node index `name`. The index comes into existence with
    /// its first committed entry.
    pub fn node_index(&self, name: impl Into<String>) -> Index<NodeId> {
        Index::new(name)
    }

    /// Handle to the relationship index `name`.
    pub fn relationship_index(&self, name: impl Into<String>) -> Index<RelId> {
        Index::new(name)
    }

    /// Names of all indexes holding at least one entry.
    pub fn index_names(&self) -> Result<Vec<IndexName>> {
        self.snapshot()?.index_names()
    }

    /// Walk from `start` over a pinned snapshot.
    pub fn traverse(&self, start: NodeId, description: &TraversalDescription) -> Result<Traverser<GraphSnapshot>> {
        Ok(description.traverse(self.snapshot()?, start))
    }

    /// Run `finder` from `start` to `end` over a pinned snapshot.
    pub fn find_path(&self, finder: &PathFinder, start: NodeId, end: NodeId) -> Result<Path> {
        finder.find_single_path(&self.snapshot()?, start, end)
    }

    /// Close the store. Persistent stores write their snapshot. Every later
    /// operation fails with `StoreClosed`. Calling again is a no-op.
    pub fn close(&self) -> Result<()> {
        self.inner.close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.is_closed() {
            return Err(Error::StoreClosed);
        }
        Ok(())
    }
}

impl std::fmt::Debug for GraphDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphDatabase")
            .field("mode", &self.inner.config.mode)
            .field("closed", &self.inner.is_closed())
            .finish()
    }
}

/// Every read takes a fresh snapshot of the latest commit.
impl GraphRead for GraphDatabase {
    fn node(&self, id: NodeId) -> Result<Node> {
        self.snapshot()?.node(id)
    }

    fn relationship(&self, id: RelId) -> Result<Relationship> {
        self.snapshot()?.relationship(id)
    }

    fn contains_node(&self, id: NodeId) -> Result<bool> {
        self.snapshot()?.contains_node(id)
    }

    fn get_property(&self, entity: impl Into<EntityId>, key: &str) -> Result<Option<Value>> {
        self.snapshot()?.get_property(entity, key)
    }

    fn get_relationships(
        &self,
        node: NodeId,
        dir: Direction,
        types: &[RelType],
    ) -> Result<Vec<Relationship>> {
        self.snapshot()?.get_relationships(node, dir, types)
    }

    fn index_lookup(
        &self,
        kind: EntityKind,
        index: &str,
        key: &str,
        value: &Value,
    ) -> Result<Vec<u64>> {
        self.snapshot()?.index_lookup(kind, index, key, value)
    }

    fn index_query(&self, kind: EntityKind, index: &str, key: &str) -> Result<Vec<u64>> {
        self.snapshot()?.index_query(kind, index, key)
    }

    fn node_count(&self) -> Result<u64> {
        self.snapshot()?.node_count()
    }

    fn relationship_count(&self) -> Result<u64> {
        self.snapshot()?.relationship_count()
    }

    fn all_node_ids(&self) -> Result<Vec<NodeId>> {
        self.snapshot()?.all_node_ids()
    }

    fn relationship_types(&self) -> Result<Vec<RelType>> {
        self.snapshot()?.relationship_types()
    }
}

// ============================================================================
// Shared store state
// ============================================================================

pub(crate) struct DatabaseInner {
    config: StoreConfig,
    committed: RwLock<Arc<GraphState>>,
    /// Held by the open `Transaction`.
    writer: Mutex<()>,
    /// Serializes snapshot writes with close.
    persist: Mutex<()>,
    /// Shared with every `GraphSnapshot` handed out.
    closed: Arc<AtomicBool>,
    next_node_id: AtomicU64,
    next_rel_id: AtomicU64,
    next_tx_id: AtomicU64,
}

impl DatabaseInner {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn next_node_id(&self) -> NodeId {
        NodeId(self.next_node_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn next_rel_id(&self) -> RelId {
        RelId(self.next_rel_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Apply `mutations` to a copy of the committed state and publish it.
    /// Nothing is published if any mutation (or the flush) fails.
    pub(crate) fn commit(&self, mutations: Vec<Mutation>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::StoreClosed);
        }

        let mut next = GraphState::clone(&self.committed.read());
        for mutation in mutations {
            next.apply(mutation)?;
        }
        let next = Arc::new(next);

        let _persist = self.persist.lock();
        if self.is_closed() {
            return Err(Error::StoreClosed);
        }
        if self.config.flush_on_commit {
            if let StorageMode::Persistent { dir } = &self.config.mode {
                snapshot::save(dir, &next, self.peek_node_id(), self.peek_rel_id())?;
            }
        }
        *self.committed.write() = next;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let _persist = self.persist.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let StorageMode::Persistent { dir } = &self.config.mode {
            let state = Arc::clone(&self.committed.read());
            snapshot::save(dir, &state, self.peek_node_id(), self.peek_rel_id())?;
        }
        info!(mode = ?self.config.mode, "graph store closed");
        Ok(())
    }

    fn peek_node_id(&self) -> u64 {
        self.next_node_id.load(Ordering::Relaxed)
    }

    fn peek_rel_id(&self) -> u64 {
        self.next_rel_id.load(Ordering::Relaxed)
    }
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            error!(error = %e, "failed to close graph store on drop");
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No active transaction")]
    NoActiveTransaction,

    #[error("Transaction was marked rollback-only")]
    RollbackOnly,

    #[error("Relationship {relationship} refers to missing node {node}")]
    EndpointNotFound { relationship: RelId, node: NodeId },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous match: {count} entities under {key} = {value}")]
    AmbiguousMatch { key: String, value: String, count: usize },

    #[error("No path from node {start} to node {end}")]
    NoPathFound { start: NodeId, end: NodeId },

    #[error("Store is closed")]
    StoreClosed,

    #[error("Another transaction holds the writer")]
    WriterBusy,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
