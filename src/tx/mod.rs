//! Transaction management.
//!
//! A `Transaction` owns the store's single writer slot for its lifetime and
//! buffers every mutation (entity creation, property writes, deletions,
//! index changes) in order. Nothing is visible to readers until `commit()`,
//! which applies the whole buffer to a copy of the committed state and
//! publishes it in one swap. If any buffered mutation fails, nothing is
//! published.
//!
//! ```text
//!   begin() ──► Open ──commit()──► Committed
//!                 │
//!                 └──rollback() / failed commit / drop──► RolledBack
//! ```

use parking_lot::MutexGuard;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::index::IndexName;
use crate::model::*;
use crate::{DatabaseInner, Error, Result};

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state. `Committed` and `RolledBack` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    Open,
    Committed,
    RolledBack,
}

/// What `finish()` will do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Undecided,
    Success,
    Failure,
}

/// One buffered write, applied in order at commit.
#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    CreateNode(NodeId),
    CreateRelationship { id: RelId, start: NodeId, end: NodeId, rel_type: RelType },
    SetProperty { entity: EntityId, key: String, value: Value },
    RemoveProperty { entity: EntityId, key: String },
    DeleteNode(NodeId),
    DetachDeleteNode(NodeId),
    DeleteRelationship(RelId),
    IndexAdd { index: IndexName, entity: EntityId, key: String, value: Value },
    IndexRemove { index: IndexName, entity: EntityId, key: String, value: Value },
    IndexRemoveEntity { index: IndexName, entity: EntityId },
}

/// A write transaction. Obtain one with `GraphDatabase::begin`.
///
/// Dropping an unfinished transaction rolls it back.
pub struct Transaction<'db> {
    id: TxId,
    db: &'db DatabaseInner,
    writer: Option<MutexGuard<'db, ()>>,
    mutations: Vec<Mutation>,
    state: TxState,
    outcome: Outcome,
}

impl<'db> Transaction<'db> {
    pub(crate) fn new(id: TxId, db: &'db DatabaseInner, writer: MutexGuard<'db, ()>) -> Self {
        Self {
            id,
            db,
            writer: Some(writer),
            mutations: Vec::new(),
            state: TxState::Open,
            outcome: Outcome::Undecided,
        }
    }

    pub fn id(&self) -> TxId { self.id }

    pub fn state(&self) -> TxState { self.state }

    pub fn is_open(&self) -> bool { self.state == TxState::Open }

    /// Number of buffered mutations.
    pub fn pending(&self) -> usize { self.mutations.len() }

    pub(crate) fn push(&mut self, mutation: Mutation) -> Result<()> {
        self.ensure_open()?;
        self.mutations.push(mutation);
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state != TxState::Open {
            return Err(Error::NoActiveTransaction);
        }
        if self.db.is_closed() {
            return Err(Error::StoreClosed);
        }
        Ok(())
    }

    // ========================================================================
    // Entity writes
    // ========================================================================

    /// Create a node. The id is assigned now; the node exists once committed.
    pub fn create_node(&mut self) -> Result<NodeId> {
        self.ensure_open()?;
        let id = self.db.next_node_id();
        self.mutations.push(Mutation::CreateNode(id));
        Ok(id)
    }

    /// Create a node carrying `props`.
    pub fn create_node_with(&mut self, props: PropertyMap) -> Result<NodeId> {
        let id = self.create_node()?;
        self.set_properties(id, props)?;
        Ok(id)
    }

    /// Create a relationship `start -[rel_type]-> end`.
    ///
    /// Both endpoints must exist when the transaction commits, otherwise the
    /// commit fails with `EndpointNotFound`.
    pub fn create_relationship(
        &mut self,
        start: NodeId,
        end: NodeId,
        rel_type: impl Into<RelType>,
    ) -> Result<RelId> {
        self.ensure_open()?;
        let id = self.db.next_rel_id();
        self.mutations.push(Mutation::CreateRelationship {
            id,
            start,
            end,
            rel_type: rel_type.into(),
        });
        Ok(id)
    }

    pub fn set_property(
        &mut self,
        entity: impl Into<EntityId>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.push(Mutation::SetProperty {
            entity: entity.into(),
            key: key.into(),
            value: value.into(),
        })
    }

    pub fn set_properties(&mut self, entity: impl Into<EntityId>, props: PropertyMap) -> Result<()> {
        let entity = entity.into();
        // Stable order keeps the mutation log reproducible.
        let mut props: Vec<(String, Value)> = props.into_iter().collect();
        props.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in props {
            self.set_property(entity, key, value)?;
        }
        Ok(())
    }

    pub fn remove_property(&mut self, entity: impl Into<EntityId>, key: impl Into<String>) -> Result<()> {
        self.push(Mutation::RemoveProperty { entity: entity.into(), key: key.into() })
    }

    /// Delete a node. The commit fails with `ConstraintViolation` if the
    /// node still has relationships at that point.
    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        self.push(Mutation::DeleteNode(id))
    }

    /// Delete a node together with every relationship touching it.
    pub fn detach_delete_node(&mut self, id: NodeId) -> Result<()> {
        self.push(Mutation::DetachDeleteNode(id))
    }

    pub fn delete_relationship(&mut self, id: RelId) -> Result<()> {
        self.push(Mutation::DeleteRelationship(id))
    }

    // ========================================================================
    // Outcome
    // ========================================================================

    /// Mark the transaction to be committed by `finish()`.
    pub fn success(&mut self) {
        if self.outcome == Outcome::Undecided {
            self.outcome = Outcome::Success;
        }
    }

    /// Mark the transaction rollback-only. Overrides `success()`.
    pub fn failure(&mut self) {
        self.outcome = Outcome::Failure;
    }

    /// Apply all buffered mutations atomically.
    ///
    /// On error the transaction ends rolled back and the store is unchanged.
    pub fn commit(&mut self) -> Result<()> {
        if self.state != TxState::Open {
            return Err(Error::NoActiveTransaction);
        }
        if self.outcome == Outcome::Failure {
            self.end(TxState::RolledBack);
            return Err(Error::RollbackOnly);
        }

        let mutations = std::mem::take(&mut self.mutations);
        let count = mutations.len();
        match self.db.commit(mutations) {
            Ok(()) => {
                debug!(tx = %self.id, mutations = count, "transaction committed");
                self.end(TxState::Committed);
                Ok(())
            }
            Err(e) => {
                debug!(tx = %self.id, error = %e, "commit failed; transaction rolled back");
                self.end(TxState::RolledBack);
                Err(e)
            }
        }
    }

    /// Discard all buffered mutations.
    pub fn rollback(&mut self) -> Result<()> {
        if self.state != TxState::Open {
            return Err(Error::NoActiveTransaction);
        }
        debug!(tx = %self.id, discarded = self.mutations.len(), "transaction rolled back");
        self.mutations.clear();
        self.end(TxState::RolledBack);
        Ok(())
    }

    /// Commit if `success()` was called (and `failure()` was not),
    /// otherwise roll back. Releases the writer slot either way.
    pub fn finish(mut self) -> Result<()> {
        if self.state != TxState::Open {
            return Ok(());
        }
        match self.outcome {
            Outcome::Success => self.commit(),
            Outcome::Undecided | Outcome::Failure => self.rollback(),
        }
    }

    fn end(&mut self, state: TxState) {
        self.state = state;
        self.mutations.clear();
        // Release the writer slot as soon as the outcome is known.
        self.writer.take();
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state == TxState::Open {
            if self.outcome == Outcome::Success {
                warn!(tx = %self.id, "transaction marked successful was dropped without finish(); rolling back");
            } else {
                debug!(tx = %self.id, "transaction dropped; rolling back");
            }
            self.mutations.clear();
            self.end(TxState::RolledBack);
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .field("pending", &self.mutations.len())
            .finish()
    }
}
