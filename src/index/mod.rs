//! Property indexes.
//!
//! A named index maps `(property key, property value)` to a set of entity
//! ids. Indexes are maintained explicitly by callers (an entity is not
//! indexed just because it carries a property) and every addition or removal
//! is buffered in the enclosing transaction, so an entity and its index
//! entries become visible together.
//!
//! `PropertyIndex` is the committed data structure owned by the graph state;
//! `Index<E>` is the typed, name-only handle callers use.

use std::marker::PhantomData;

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::model::{EntityKind, IndexEntity, Value};
use crate::storage::GraphRead;
use crate::tx::{Mutation, Transaction};
use crate::{Error, Result};

// ============================================================================
// Keys
// ============================================================================

/// Identifies one index: the entity kind it holds plus its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexName {
    pub kind: EntityKind,
    pub name: String,
}

impl IndexName {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into() }
    }
}

/// Hashable form of a `Value`. Floats are keyed by bit pattern, so
/// `Int(1)` and `Float(1.0)` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum IndexValue {
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
}

impl From<&Value> for IndexValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(b) => IndexValue::Bool(*b),
            Value::Int(i) => IndexValue::Int(*i),
            Value::Float(f) => IndexValue::Float(f.to_bits()),
            Value::String(s) => IndexValue::String(s.clone()),
        }
    }
}

impl IndexValue {
    fn to_value(&self) -> Value {
        match self {
            IndexValue::Bool(b) => Value::Bool(*b),
            IndexValue::Int(i) => Value::Int(*i),
            IndexValue::Float(bits) => Value::Float(f64::from_bits(*bits)),
            IndexValue::String(s) => Value::String(s.clone()),
        }
    }
}

// ============================================================================
// PropertyIndex
// ============================================================================

/// Committed contents of one index. Entity ids are stored raw; the owning
/// `IndexName` says which kind they are.
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    /// key → value → entity ids
    entries: HashMap<String, HashMap<IndexValue, HashSet<u64>>>,
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the entry was already present.
    pub fn add(&mut self, key: &str, value: &Value, entity: u64) -> bool {
        self.entries
            .entry_ref(key)
            .or_default()
            .entry(IndexValue::from(value))
            .or_default()
            .insert(entity)
    }

    /// Returns false if the entry was not present.
    pub fn remove(&mut self, key: &str, value: &Value, entity: u64) -> bool {
        let Some(values) = self.entries.get_mut(key) else { return false };
        let value = IndexValue::from(value);
        let Some(ids) = values.get_mut(&value) else { return false };
        let removed = ids.remove(&entity);
        if ids.is_empty() {
            values.remove(&value);
        }
        if values.is_empty() {
            self.entries.remove(key);
        }
        removed
    }

    /// Drop every entry for `entity`. Returns how many entries were removed.
    pub fn remove_entity(&mut self, entity: u64) -> usize {
        let mut removed = 0;
        for values in self.entries.values_mut() {
            for ids in values.values_mut() {
                if ids.remove(&entity) {
                    removed += 1;
                }
            }
            values.retain(|_, ids| !ids.is_empty());
        }
        self.entries.retain(|_, values| !values.is_empty());
        removed
    }

    /// Entities registered under exactly `(key, value)`, sorted by id.
    pub fn get(&self, key: &str, value: &Value) -> Vec<u64> {
        let mut ids: Vec<u64> = self.entries
            .get(key)
            .and_then(|values| values.get(&IndexValue::from(value)))
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids
    }

    /// Entities registered under `key` with any value, sorted and deduplicated.
    pub fn query(&self, key: &str) -> Vec<u64> {
        let mut ids: Vec<u64> = self.entries
            .get(key)
            .map(|values| values.values().flatten().copied().collect())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Number of (key, value, entity) entries.
    pub fn len(&self) -> usize {
        self.entries.values().flat_map(|v| v.values()).map(|ids| ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entry as `(key, value, entity)`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Value, u64)> + '_ {
        self.entries.iter().flat_map(|(key, values)| {
            values.iter().flat_map(move |(value, ids)| {
                ids.iter().map(move |id| (key.as_str(), value.to_value(), *id))
            })
        })
    }
}

// ============================================================================
// Typed handle
// ============================================================================

/// A named index over nodes (`Index<NodeId>`) or relationships
/// (`Index<RelId>`). Holds no data; all reads go through a `GraphRead`
/// and all writes through a `Transaction`.
///
/// Indexes are created implicitly by their first committed entry; looking
/// up an index that was never written to returns no matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index<E: IndexEntity> {
    name: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E: IndexEntity> Index<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), _entity: PhantomData }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn index_name(&self) -> IndexName {
        IndexName::new(E::KIND, self.name.clone())
    }

    /// Register `entity` under `(key, value)` once `tx` commits.
    pub fn add(
        &self,
        tx: &mut Transaction<'_>,
        entity: E,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        tx.push(Mutation::IndexAdd {
            index: self.index_name(),
            entity: entity.into(),
            key: key.into(),
            value: value.into(),
        })
    }

    /// Remove one `(key, value)` entry for `entity` once `tx` commits.
    pub fn remove(
        &self,
        tx: &mut Transaction<'_>,
        entity: E,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<()> {
        tx.push(Mutation::IndexRemove {
            index: self.index_name(),
            entity: entity.into(),
            key: key.into(),
            value: value.into(),
        })
    }

    /// Remove every entry for `entity` from this index once `tx` commits.
    pub fn remove_entity(&self, tx: &mut Transaction<'_>, entity: E) -> Result<()> {
        tx.push(Mutation::IndexRemoveEntity {
            index: self.index_name(),
            entity: entity.into(),
        })
    }

    /// All entities registered under `(key, value)`, sorted by id.
    pub fn get<G: GraphRead>(&self, graph: &G, key: &str, value: impl Into<Value>) -> Result<Vec<E>> {
        let ids = graph.index_lookup(E::KIND, &self.name, key, &value.into())?;
        Ok(ids.into_iter().map(E::from_raw).collect())
    }

    /// The single entity registered under `(key, value)`.
    ///
    /// Fails with `NotFound` on zero matches and `AmbiguousMatch` on more
    /// than one.
    pub fn get_single<G: GraphRead>(&self, graph: &G, key: &str, value: impl Into<Value>) -> Result<E> {
        let value = value.into();
        let ids = graph.index_lookup(E::KIND, &self.name, key, &value)?;
        match ids.as_slice() {
            [id] => Ok(E::from_raw(*id)),
            [] => Err(Error::NotFound(format!("index '{}' entry {key}={value}", self.name))),
            _ => Err(Error::AmbiguousMatch {
                key: key.to_string(),
                value: value.to_string(),
                count: ids.len(),
            }),
        }
    }

    /// All entities registered under `key` with any value.
    pub fn query<G: GraphRead>(&self, graph: &G, key: &str) -> Result<Vec<E>> {
        let ids = graph.index_query(E::KIND, &self.name, key)?;
        Ok(ids.into_iter().map(E::from_raw).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_get_remove() {
        let mut index = PropertyIndex::new();
        assert!(index.add("name", &Value::from("Peter"), 1));
        assert!(index.add("name", &Value::from("Peter"), 2));
        assert!(!index.add("name", &Value::from("Peter"), 2));
        assert!(index.add("id", &Value::Int(1), 1));

        assert_eq!(index.get("name", &Value::from("Peter")), vec![1, 2]);
        assert_eq!(index.get("id", &Value::Int(1)), vec![1]);
        assert_eq!(index.len(), 3);

        assert!(index.remove("name", &Value::from("Peter"), 1));
        assert!(!index.remove("name", &Value::from("Peter"), 1));
        assert_eq!(index.get("name", &Value::from("Peter")), vec![2]);
    }

    #[test]
    fn test_value_kinds_are_distinct_keys() {
        let mut index = PropertyIndex::new();
        index.add("id", &Value::Int(1), 7);
        assert!(index.get("id", &Value::Float(1.0)).is_empty());
        assert!(index.get("id", &Value::from("1")).is_empty());
        assert_eq!(index.get("id", &Value::Int(1)), vec![7]);
    }

    #[test]
    fn test_remove_entity_prunes_empty_buckets() {
        let mut index = PropertyIndex::new();
        index.add("id", &Value::Int(1), 1);
        index.add("name", &Value::from("Peter"), 1);
        index.add("name", &Value::from("Ray"), 2);

        assert_eq!(index.remove_entity(1), 2);
        assert!(index.query("id").is_empty());
        assert_eq!(index.query("name"), vec![2]);
        assert_eq!(index.remove_entity(2), 1);
        assert!(index.is_empty());
    }

    #[test]
    fn test_query_by_key_dedups() {
        let mut index = PropertyIndex::new();
        index.add("role", &Value::from("guest"), 4);
        index.add("role", &Value::from("user"), 5);
        index.add("role", &Value::from("admin"), 4);
        assert_eq!(index.query("role"), vec![4, 5]);
    }

    #[test]
    fn test_entries_roundtrip_values() {
        let mut index = PropertyIndex::new();
        index.add("distance", &Value::Float(2.5), 3);
        let entries: Vec<_> = index.entries().map(|(k, v, id)| (k.to_string(), v, id)).collect();
        assert_eq!(entries, vec![("distance".to_string(), Value::Float(2.5), 3)]);
    }
}
