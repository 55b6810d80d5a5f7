//! On-disk snapshot for `StorageMode::Persistent`.
//!
//! The whole committed state is written as one JSON document,
//! `<dir>/graph.json`. Writes go to `graph.json.tmp` first and are renamed
//! over the old file, so a crash mid-write leaves the previous snapshot.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::index::{IndexName, PropertyIndex};
use crate::model::*;
use crate::{Error, Result};
use super::GraphState;

pub const SNAPSHOT_FILE: &str = "graph.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    next_node_id: u64,
    next_rel_id: u64,
    nodes: Vec<Node>,
    relationships: Vec<Relationship>,
    indexes: Vec<IndexDump>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexDump {
    index: IndexName,
    entries: Vec<IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    key: String,
    value: Value,
    entity: u64,
}

/// State restored from disk, with the id counters to resume from.
#[derive(Debug)]
pub(crate) struct Restored {
    pub state: GraphState,
    pub next_node_id: u64,
    pub next_rel_id: u64,
}

pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join(SNAPSHOT_FILE)
}

/// Load `<dir>/graph.json`. A missing file is an empty store (`None`).
pub(crate) fn load(dir: &Path) -> Result<Option<Restored>> {
    let path = snapshot_path(dir);
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(&path)?;
    let snapshot: SnapshotFile = serde_json::from_reader(BufReader::new(file))?;
    if snapshot.version != FORMAT_VERSION {
        return Err(Error::Storage(format!(
            "unsupported snapshot version {} in {}",
            snapshot.version,
            path.display()
        )));
    }

    let indexes = snapshot
        .indexes
        .into_iter()
        .map(|dump| {
            let mut index = PropertyIndex::new();
            for entry in dump.entries {
                index.add(&entry.key, &entry.value, entry.entity);
            }
            (dump.index, index)
        })
        .collect();

    let state = GraphState::from_parts(snapshot.nodes, snapshot.relationships, indexes)?;
    debug!(path = %path.display(), "snapshot loaded");
    Ok(Some(Restored {
        state,
        next_node_id: snapshot.next_node_id,
        next_rel_id: snapshot.next_rel_id,
    }))
}

/// Write `state` to `<dir>/graph.json` via a temp file and rename.
pub(crate) fn save(dir: &Path, state: &GraphState, next_node_id: u64, next_rel_id: u64) -> Result<()> {
    fs::create_dir_all(dir)?;

    let mut nodes: Vec<Node> = state.nodes().cloned().collect();
    nodes.sort_by_key(|n| n.id);
    let mut relationships: Vec<Relationship> = state.relationships().cloned().collect();
    relationships.sort_by_key(|r| r.id);
    let mut indexes: Vec<IndexDump> = state
        .indexes()
        .map(|(name, index)| IndexDump {
            index: name.clone(),
            entries: index
                .entries()
                .map(|(key, value, entity)| IndexEntry { key: key.to_string(), value, entity })
                .collect(),
        })
        .collect();
    indexes.sort_by(|a, b| a.index.name.cmp(&b.index.name));

    let snapshot = SnapshotFile {
        version: FORMAT_VERSION,
        next_node_id,
        next_rel_id,
        nodes,
        relationships,
        indexes,
    };

    let path = snapshot_path(dir);
    let mut tmp = path.clone();
    tmp.set_extension("json.tmp");
    {
        let file = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }
    fs::rename(&tmp, &path)?;
    debug!(path = %path.display(), nodes = snapshot.nodes.len(), "snapshot written");
    Ok(())
}
