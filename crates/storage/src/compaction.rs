//! Background reconciliation of index, shards, and WAL (spec §4.6, C6).

use crate::index::GlobalIndex;
use crate::shard::ShardStore;
use docvault_core::{RecordId, Result};
use docvault_durability::wal::{self, Operation, WalEntry};
use std::path::Path;

/// Counts-only compaction summary (spec §4.6 step 5: "no log-level
/// narration in this spec" — callers that want logging wrap this).
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactionReport {
    pub wal_entries_replayed: usize,
    pub index_entries_self_healed: usize,
    pub shard_files_removed: usize,
}

/// Replays `entries` onto `index`, reconstructing full `IndexEntry`
/// attributes (filename, folder, checksum) from the shard file a `Put`
/// entry names — the WAL itself only carries id and shard coordinate, so
/// the shard write (which always precedes the WAL append, spec §4.2) is the
/// source of truth for the denormalized fields.
pub fn apply_wal_entries(index: &mut GlobalIndex, shards: &ShardStore, entries: &[WalEntry]) {
    for entry in entries {
        match entry.operation {
            Operation::Put => {
                if let Ok(record) = shards.read(&entry.record_id, entry.shard_coordinate) {
                    index.insert(
                        record.id.clone(),
                        entry.shard_coordinate,
                        record.filename.clone(),
                        record.folder.clone(),
                        record.checksum.clone(),
                        record.updated_at,
                    );
                }
                // A Put entry whose shard file is absent means the crash
                // landed before the shard write completed; nothing to index.
            }
            Operation::Del => {
                index.remove(&entry.record_id);
                let _ = shards.delete(&entry.record_id, entry.shard_coordinate);
            }
        }
    }
}

/// Runs one compaction pass: replay-and-truncate the WAL, self-heal index
/// entries whose shard file vanished, remove shard files no longer
/// referenced, then atomically rewrite the index.
///
/// Never blocks readers beyond the index-rewrite segment (spec §4.6): this
/// function only takes an exclusive `&mut GlobalIndex` for that tail, not
/// for the WAL replay or shard scan.
pub fn compact(index: &mut GlobalIndex, shards: &ShardStore, wal_dir: &Path) -> Result<CompactionReport> {
    let replay_result = wal::replay(wal_dir)?;
    apply_wal_entries(index, shards, &replay_result.entries);
    wal::truncate(wal_dir)?;

    let stale_ids: Vec<RecordId> = index
        .iter()
        .filter(|(id, entry)| !shards.exists(id, entry.shard))
        .map(|(id, _)| id.clone())
        .collect();
    for id in &stale_ids {
        index.remove(id);
    }

    let mut shard_files_removed = 0usize;
    for coord in shards.list_shard_coordinates()? {
        for id in shards.list_shard_ids(coord)? {
            if index.lookup(&id).is_none() {
                shards.delete(&id, coord)?;
                shard_files_removed += 1;
            }
        }
    }

    index.rewrite()?;

    Ok(CompactionReport {
        wal_entries_replayed: replay_result.entries.len(),
        index_entries_self_healed: stale_ids.len(),
        shard_files_removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use docvault_core::Record;
    use docvault_durability::wal::{WalConfig, WalWriter};
    use tempfile::tempdir;

    fn sample(id: &str) -> Record {
        Record::new_uploading(
            docvault_core::RecordId::new(id),
            "a.txt",
            "ck",
            1,
            "",
            "p",
            Utc::now(),
        )
    }

    #[test]
    fn compaction_removes_unreferenced_shard_file() {
        let dir = tempdir().unwrap();
        let shards = ShardStore::new(dir.path().join("shards"), 1000);
        let mut index = GlobalIndex::load(dir.path().join("index.v1")).unwrap();
        let wal_dir = dir.path().join("wal");

        let orphan = sample("1");
        shards.write(&orphan).unwrap();
        // no index entry and no WAL entry for it — pure orphan.

        let report = compact(&mut index, &shards, &wal_dir).unwrap();
        assert_eq!(report.shard_files_removed, 1);
        assert!(!shards.exists(&orphan.id, 0));
    }

    #[test]
    fn compaction_self_heals_missing_shard_file() {
        let dir = tempdir().unwrap();
        let shards = ShardStore::new(dir.path().join("shards"), 1000);
        let mut index = GlobalIndex::load(dir.path().join("index.v1")).unwrap();
        let wal_dir = dir.path().join("wal");

        index.insert(
            docvault_core::RecordId::new("5"),
            0,
            "a.txt".into(),
            "".into(),
            "ck".into(),
            Utc::now(),
        );
        // Shard file was never written for id 5.

        let report = compact(&mut index, &shards, &wal_dir).unwrap();
        assert_eq!(report.index_entries_self_healed, 1);
        assert!(index.lookup(&docvault_core::RecordId::new("5")).is_none());
    }

    #[test]
    fn compaction_replays_pending_wal_entries() {
        let dir = tempdir().unwrap();
        let shards = ShardStore::new(dir.path().join("shards"), 1000);
        let mut index = GlobalIndex::load(dir.path().join("index.v1")).unwrap();
        let wal_dir = dir.path().join("wal");

        let record = sample("9");
        shards.write(&record).unwrap();
        let mut writer = WalWriter::open(&wal_dir, WalConfig::default()).unwrap();
        writer
            .append(&WalEntry::put(record.id.clone(), 0, Some(record.checksum.clone()), 0))
            .unwrap();
        writer.close().unwrap();

        let report = compact(&mut index, &shards, &wal_dir).unwrap();
        assert_eq!(report.wal_entries_replayed, 1);
        assert!(index.lookup(&record.id).is_some());
    }
}
