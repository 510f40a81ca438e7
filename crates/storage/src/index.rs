//! In-memory global index with an authoritative on-disk representation
//! (spec §4.4, C4).

use docvault_core::folder::is_descendant_or_equal;
use docvault_core::{Error, RecordId, Result};
use docvault_durability::wal::frame;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Denormalized per-id attributes the index keeps alongside shard location,
/// so `list`/`find_by_checksum` never have to hit disk (spec §4.4 schema).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub shard: u64,
    pub filename: String,
    pub folder: String,
    pub checksum: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    /// Monotonic insertion sequence, used to keep `by_folder` results in
    /// insertion-preserving order without a second ordered structure per folder.
    pub seq: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexSnapshot {
    last_id_ord: u64,
    next_seq: u64,
    entries: Vec<(RecordId, IndexEntry)>,
}

/// The Global Index: primary `id -> IndexEntry` map plus secondary
/// `checksum -> id` map, derived `by_folder` queries, and a persisted
/// on-disk mirror.
pub struct GlobalIndex {
    path: PathBuf,
    last_id_ord: u64,
    next_seq: u64,
    primary: HashMap<RecordId, IndexEntry>,
    by_checksum: HashMap<String, RecordId>,
    mutations_since_rewrite: u64,
}

impl GlobalIndex {
    /// Loads the index from `path` if present, otherwise starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(GlobalIndex {
                path,
                last_id_ord: 0,
                next_seq: 0,
                primary: HashMap::new(),
                by_checksum: HashMap::new(),
                mutations_since_rewrite: 0,
            });
        }
        let bytes = fs::read(&path)?;
        let mut cursor = Cursor::new(bytes.as_slice());
        let snapshot: IndexSnapshot = frame::decode_one(&mut cursor)
            .map_err(|e| Error::Corrupt(format!("index file: {e}")))?
            .ok_or_else(|| Error::Corrupt("empty index file".into()))?;
        let mut by_checksum = HashMap::new();
        let mut primary = HashMap::new();
        for (id, entry) in snapshot.entries {
            by_checksum.insert(entry.checksum.clone(), id.clone());
            primary.insert(id, entry);
        }
        debug!(entries = primary.len(), "loaded global index");
        Ok(GlobalIndex {
            path,
            last_id_ord: snapshot.last_id_ord,
            next_seq: snapshot.next_seq,
            primary,
            by_checksum,
            mutations_since_rewrite: 0,
        })
    }

    pub fn last_id_ord(&self) -> u64 {
        self.last_id_ord
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    pub fn mutations_since_rewrite(&self) -> u64 {
        self.mutations_since_rewrite
    }

    /// O(1) id lookup.
    pub fn lookup(&self, id: &RecordId) -> Option<&IndexEntry> {
        self.primary.get(id)
    }

    /// O(1) checksum lookup.
    pub fn by_checksum(&self, checksum: &str) -> Option<&RecordId> {
        self.by_checksum.get(checksum)
    }

    /// Ids whose folder equals or descends from `path`, insertion-ordered.
    pub fn by_folder(&self, path: &str) -> Vec<RecordId> {
        self.list(path, true)
    }

    /// Ids matching `path`, either exactly (`recursive = false`) or `path`
    /// and every descendant (`recursive = true`), insertion-ordered (spec
    /// §4.7 `list(folder, recursive)`).
    pub fn list(&self, path: &str, recursive: bool) -> Vec<RecordId> {
        let normalized = docvault_core::folder::normalize(path);
        let mut matches: Vec<(&RecordId, u64)> = self
            .primary
            .iter()
            .filter(|(_, entry)| {
                if recursive {
                    is_descendant_or_equal(&entry.folder, &normalized)
                } else {
                    docvault_core::folder::normalize(&entry.folder) == normalized
                }
            })
            .map(|(id, entry)| (id, entry.seq))
            .collect();
        matches.sort_by_key(|(_, seq)| *seq);
        matches.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn insert(
        &mut self,
        id: RecordId,
        shard: u64,
        filename: String,
        folder: String,
        checksum: String,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_checksum.insert(checksum.clone(), id.clone());
        self.primary.insert(
            id.clone(),
            IndexEntry {
                shard,
                filename,
                folder,
                checksum,
                updated_at,
                seq,
            },
        );
        self.last_id_ord = self.last_id_ord.max(id.ord());
        self.mutations_since_rewrite += 1;
    }

    pub fn update_checksum_and_time(
        &mut self,
        id: &RecordId,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) {
        if let Some(entry) = self.primary.get_mut(id) {
            entry.updated_at = updated_at;
        }
        self.mutations_since_rewrite += 1;
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<IndexEntry> {
        let entry = self.primary.remove(id);
        if let Some(entry) = &entry {
            if self.by_checksum.get(&entry.checksum) == Some(id) {
                self.by_checksum.remove(&entry.checksum);
            }
        }
        self.mutations_since_rewrite += 1;
        entry
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &IndexEntry)> {
        self.primary.iter()
    }

    /// Atomically rewrites the index file (temp + rename), as required
    /// before durability can be handed back to the WAL (spec §4.4 "Persistence").
    pub fn rewrite(&mut self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let snapshot = IndexSnapshot {
            last_id_ord: self.last_id_ord,
            next_seq: self.next_seq,
            entries: self
                .primary
                .iter()
                .map(|(id, entry)| (id.clone(), entry.clone()))
                .collect(),
        };
        let encoded = frame::encode(&snapshot).map_err(|e| Error::Corrupt(e.to_string()))?;
        let tmp = self.path.with_extension("v1.tmp");
        fs::write(&tmp, &encoded)?;
        fs::rename(&tmp, &self.path)?;
        self.mutations_since_rewrite = 0;
        debug!(entries = self.primary.len(), "rewrote global index");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
