//! The Record Store: public surface combining the index, shards, WAL, lock,
//! and cache into the operations of spec §4.7.

use chrono::{DateTime, Utc};
use docvault_concurrency::GlobalLock;
use docvault_core::{Error, Record, RecordId, RecordPatch, RecordStatus, Result, StoreConfig};
use docvault_durability::wal::{self, frame, DurabilityMode, WalConfig, WalEntry, WalWriter};
use docvault_storage::{apply_wal_entries, compact, CompactionReport, GlobalIndex, RecordCache, ShardStore};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// State serialized by the write-side global lock: the WAL writer and the
/// explicit folder registry. The index lives in its own `RwLock` (see
/// [`RecordStore`]) so concurrent readers never wait on a writer that is
/// merely appending to the WAL (spec §5 "the LRU cache is guarded by its own
/// fine-grained mutex, disjoint from the global lock" — we extend the same
/// principle to index reads).
struct WriteState {
    wal: WalWriter,
    folders: HashSet<String>,
}

/// The sharded, WAL-backed, cached record store (spec §4.3–§4.7).
pub struct RecordStore {
    root: PathBuf,
    wal_dir: PathBuf,
    wal_config: WalConfig,
    config: StoreConfig,
    shards: ShardStore,
    pub(crate) index: RwLock<GlobalIndex>,
    cache: RecordCache,
    write_lock: GlobalLock<WriteState>,
    id_alloc: docvault_core::IdAllocator,
    mutations_since_compaction: AtomicUsize,
    /// Store-wide embedding dimensionality, fixed at first write (spec §3
    /// invariant 5, §8 invariant 5). `None` until the first record carrying
    /// an embedding is created or updated.
    embedding_dim: RwLock<Option<usize>>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn folders_path(root: &Path) -> PathBuf {
    root.join("folders.v1")
}

fn load_folders(path: &Path) -> Result<HashSet<String>> {
    if !path.exists() {
        return Ok(HashSet::new());
    }
    let bytes = fs::read(path)?;
    let mut cursor = Cursor::new(bytes.as_slice());
    let list: Vec<String> = frame::decode_one(&mut cursor)
        .map_err(|e| Error::Corrupt(format!("folders file: {e}")))?
        .unwrap_or_default();
    Ok(list.into_iter().collect())
}

fn embedding_dim_path(root: &Path) -> PathBuf {
    root.join("embedding_dim.v1")
}

fn load_embedding_dim(path: &Path) -> Result<Option<usize>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(path)?;
    let mut cursor = Cursor::new(bytes.as_slice());
    let dim: Option<usize> = frame::decode_one(&mut cursor)
        .map_err(|e| Error::Corrupt(format!("embedding dimension file: {e}")))?;
    Ok(dim)
}

impl RecordStore {
    /// Opens (or initializes) the store at `root`: loads the index, replays
    /// and truncates any pending WAL entries, then refuses to serve with
    /// `Inconsistent` if any index entry still has no shard file backing it
    /// (spec §4.4 "after successful startup recovery... or the store refuses
    /// to serve"). Self-healing such entries is the job of the explicit
    /// [`RecordStore::compact`]/[`RecordStore::recover`] pass, not `open`.
    pub fn open(root: impl Into<PathBuf>, config: StoreConfig) -> Result<Arc<Self>> {
        config.validate().map_err(Error::Corrupt)?;
        let root = root.into();
        fs::create_dir_all(&root)?;

        let shards = ShardStore::new(root.join("shards"), config.shard_width);
        let wal_dir = root.join("wal");
        let wal_config = WalConfig {
            mode: DurabilityMode::Batched {
                interval_ms: 1000,
                batch_size: config.wal_fsync_interval,
            },
            ..WalConfig::default()
        };

        let mut index = GlobalIndex::load(root.join("index.v1"))?;
        let replay_result = wal::replay(&wal_dir)?;
        apply_wal_entries(&mut index, &shards, &replay_result.entries);
        wal::truncate(&wal_dir)?;
        index.rewrite()?;

        for (id, entry) in index.iter() {
            if !shards.exists(id, entry.shard) {
                return Err(Error::Inconsistent(format!(
                    "index entry {id} references missing shard file at coordinate {}",
                    entry.shard
                )));
            }
        }

        let folders = load_folders(&folders_path(&root))?;
        let embedding_dim = load_embedding_dim(&embedding_dim_path(&root))?;
        let wal = WalWriter::open(&wal_dir, wal_config.clone())?;
        let id_alloc = docvault_core::IdAllocator::starting_at(index.last_id_ord());
        let cache = RecordCache::new(config.cache_capacity);
        let write_lock = GlobalLock::new(
            root.join("lock"),
            std::time::Duration::from_secs(5),
            WriteState { wal, folders },
        );

        info!(root = %root.display(), entries = index.len(), "opened record store");

        Ok(Arc::new(RecordStore {
            root,
            wal_dir,
            wal_config,
            config,
            shards,
            index: RwLock::new(index),
            cache,
            write_lock,
            id_alloc,
            mutations_since_compaction: AtomicUsize::new(0),
            embedding_dim: RwLock::new(embedding_dim),
        }))
    }

    fn persist_folders(&self, folders: &HashSet<String>) -> Result<()> {
        let mut list: Vec<String> = folders.iter().cloned().collect();
        list.sort();
        let encoded = frame::encode(&list).map_err(|e| Error::Corrupt(e.to_string()))?;
        let path = folders_path(&self.root);
        let tmp = path.with_extension("v1.tmp");
        fs::write(&tmp, &encoded)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Enforces spec §3 invariant 5: the first record written with a present
    /// embedding fixes the store-wide dimensionality; every subsequent
    /// present embedding must match it exactly.
    fn check_and_set_embedding_dim(&self, embedding: Option<&Vec<f32>>) -> Result<()> {
        let Some(embedding) = embedding else {
            return Ok(());
        };
        let mut dim = self.embedding_dim.write();
        match *dim {
            Some(existing) if existing != embedding.len() => Err(Error::Inconsistent(format!(
                "embedding dimensionality {} does not match store-wide dimensionality {existing}",
                embedding.len()
            ))),
            Some(_) => Ok(()),
            None => {
                let encoded = frame::encode(&embedding.len()).map_err(|e| Error::Corrupt(e.to_string()))?;
                let path = embedding_dim_path(&self.root);
                let tmp = path.with_extension("v1.tmp");
                fs::write(&tmp, &encoded)?;
                fs::rename(&tmp, &path)?;
                *dim = Some(embedding.len());
                Ok(())
            }
        }
    }

    fn maybe_rewrite_index(&self, index: &mut GlobalIndex) -> Result<()> {
        if index.mutations_since_rewrite() >= self.config.index_rewrite_interval {
            index.rewrite()?;
        }
        Ok(())
    }

    fn maybe_compact(&self) -> Result<()> {
        let count = self.mutations_since_compaction.fetch_add(1, Ordering::SeqCst) + 1;
        if count as u64 >= self.config.compaction_interval {
            self.mutations_since_compaction.store(0, Ordering::SeqCst);
            self.compact()?;
        }
        Ok(())
    }

    /// Allocates a fresh monotonic id, resumable across restarts (spec §4.3).
    pub fn allocate_id(&self) -> RecordId {
        self.id_alloc.allocate()
    }

    /// Creates a fresh record. Fails `Duplicate` if the id already exists;
    /// fails `ChecksumConflict` if `enforce_checksum_unique` is set and the
    /// checksum is already indexed (spec §4.7).
    pub fn create(&self, record: Record, enforce_checksum_unique: bool) -> Result<()> {
        let mut write = self.write_lock.acquire()?;
        {
            let index = self.index.read();
            if index.lookup(&record.id).is_some() {
                return Err(Error::Duplicate(record.id.to_string()));
            }
            if enforce_checksum_unique && index.by_checksum(&record.checksum).is_some() {
                return Err(Error::ChecksumConflict(record.checksum.clone()));
            }
        }
        self.check_and_set_embedding_dim(record.embedding.as_ref())?;
        self.shards.write(&record)?;
        let coord = self.shards.coordinate_for(&record.id);
        write.wal.append(&WalEntry::put(
            record.id.clone(),
            coord,
            Some(record.checksum.clone()),
            now_millis(),
        ))?;
        {
            let mut index = self.index.write();
            index.insert(
                record.id.clone(),
                coord,
                record.filename.clone(),
                record.folder.clone(),
                record.checksum.clone(),
                record.updated_at,
            );
            self.maybe_rewrite_index(&mut index)?;
        }
        self.cache.put(record);
        write.wal.flush()?;
        drop(write);
        self.maybe_compact()
    }

    /// Fetches a record by id, O(1) amortized via the cache (spec §4.7 `get`).
    pub fn get(&self, id: &RecordId) -> Result<Record> {
        if let Some(record) = self.cache.get(id) {
            return Ok(record);
        }
        let entry = {
            let index = self.index.read();
            index.lookup(id).cloned().ok_or_else(|| Error::not_found(id))?
        };
        let record = self.shards.read(id, entry.shard)?;
        self.cache.put(record.clone());
        Ok(record)
    }

    /// Applies a partial update to a record's mutable fields. An empty patch
    /// is a true no-op: no WAL append, no shard rewrite (spec §4.7 `update`).
    pub fn update(&self, id: &RecordId, patch: RecordPatch) -> Result<Record> {
        if patch.is_empty() {
            return self.get(id);
        }
        let mut write = self.write_lock.acquire()?;
        let entry = {
            let index = self.index.read();
            index.lookup(id).cloned().ok_or_else(|| Error::not_found(id))?
        };
        let mut record = self.shards.read(id, entry.shard)?;
        let now: DateTime<Utc> = Utc::now();
        patch.apply(&mut record, now);
        self.check_and_set_embedding_dim(record.embedding.as_ref())?;
        self.shards.write(&record)?;
        write.wal.append(&WalEntry::put(
            id.clone(),
            entry.shard,
            Some(record.checksum.clone()),
            now.timestamp_millis(),
        ))?;
        {
            let mut index = self.index.write();
            index.update_checksum_and_time(id, now);
            self.maybe_rewrite_index(&mut index)?;
        }
        self.cache.put(record.clone());
        write.wal.flush()?;
        drop(write);
        self.maybe_compact()?;
        Ok(record)
    }

    /// Removes a record, its shard file, and its index references.
    /// Idempotent: a second delete returns a benign `NotFound` (spec §4.7).
    pub fn delete(&self, id: &RecordId) -> Result<()> {
        let mut write = self.write_lock.acquire()?;
        let entry = {
            let mut index = self.index.write();
            index.remove(id)
        };
        let entry = entry.ok_or_else(|| Error::not_found(id))?;
        self.shards.delete(id, entry.shard)?;
        write.wal.append(&WalEntry::del(id.clone(), entry.shard, now_millis()))?;
        self.cache.invalidate(id);
        {
            let mut index = self.index.write();
            self.maybe_rewrite_index(&mut index)?;
        }
        write.wal.flush()?;
        drop(write);
        self.maybe_compact()
    }

    /// Lists ids whose folder matches `folder`, in insertion order (spec
    /// §4.7 `list`).
    pub fn list(&self, folder: &str, recursive: bool) -> Vec<RecordId> {
        self.index.read().list(folder, recursive)
    }

    /// Looks up the id carrying `checksum` (spec §4.7 `find_by_checksum`).
    pub fn find_by_checksum(&self, checksum: &str) -> Result<RecordId> {
        self.index
            .read()
            .by_checksum(checksum)
            .cloned()
            .ok_or_else(|| Error::not_found(checksum))
    }

    /// Registers an explicit (possibly empty) folder. Idempotent.
    pub fn create_folder(&self, path: &str) -> Result<()> {
        let normalized = docvault_core::folder::normalize(path);
        let mut write = self.write_lock.acquire()?;
        if write.folders.insert(normalized) {
            self.persist_folders(&write.folders)?;
        }
        Ok(())
    }

    /// Removes an explicit folder. Non-recursive deletion of a non-empty
    /// folder fails; recursive deletion fans out to every descendant record
    /// (spec §4.7 `delete_folder`). Returns the count of records removed.
    pub fn delete_folder(&self, path: &str, recursive: bool) -> Result<usize> {
        let normalized = docvault_core::folder::normalize(path);
        let mut write = self.write_lock.acquire()?;
        let descendants = self.index.read().list(&normalized, true);
        if !recursive && !descendants.is_empty() {
            return Err(Error::Inconsistent(format!(
                "folder '{normalized}' has {} record(s); pass recursive=true to remove them",
                descendants.len()
            )));
        }
        for id in &descendants {
            let entry = self.index.write().remove(id);
            if let Some(entry) = entry {
                self.shards.delete(id, entry.shard)?;
                write.wal.append(&WalEntry::del(id.clone(), entry.shard, now_millis()))?;
                self.cache.invalidate(id);
            }
        }
        write.folders.remove(&normalized);
        self.persist_folders(&write.folders)?;
        {
            let mut index = self.index.write();
            self.maybe_rewrite_index(&mut index)?;
        }
        write.wal.flush()?;
        drop(write);
        if !descendants.is_empty() {
            self.maybe_compact()?;
        }
        Ok(descendants.len())
    }

    /// Runs one compaction pass on demand (spec §4.6). Held under both the
    /// write lock and the index's exclusive lock for its full duration,
    /// documented in DESIGN.md, since the underlying replay/self-heal/scan
    /// pass is not split into phases that could run outside the lock.
    pub fn compact(&self) -> Result<CompactionReport> {
        let mut write = self.write_lock.acquire()?;
        let mut index = self.index.write();
        let report = compact(&mut index, &self.shards, &self.wal_dir)?;
        write.wal = WalWriter::open(&self.wal_dir, self.wal_config.clone())?;
        Ok(report)
    }

    /// Every id currently present in the index, in arbitrary order — used
    /// by `verify`/`recover` (spec §6) to walk the whole store.
    pub fn all_ids(&self) -> Vec<RecordId> {
        self.index.read().iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn cache_stats(&self) -> docvault_storage::CacheStats {
        self.cache.stats()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}
