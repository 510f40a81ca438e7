//! On-disk shard layout: one file per record, bucketed by shard coordinate
//! (spec §4.3, C3).

use docvault_core::{shard_coordinate, shard_dir_name, Error, Record, RecordId, Result};
use docvault_durability::wal::frame;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Root-relative `shards/` directory owning one subdirectory per shard
/// coordinate and one `<id>.rec` file per record.
pub struct ShardStore {
    root: PathBuf,
    shard_width: u64,
}

impl ShardStore {
    pub fn new(root: impl Into<PathBuf>, shard_width: u64) -> Self {
        ShardStore {
            root: root.into(),
            shard_width,
        }
    }

    pub fn shard_width(&self) -> u64 {
        self.shard_width
    }

    pub fn coordinate_for(&self, id: &RecordId) -> u64 {
        shard_coordinate(id, self.shard_width)
    }

    fn shard_dir(&self, coord: u64) -> PathBuf {
        self.root.join(shard_dir_name(coord, self.shard_width))
    }

    fn record_path(&self, id: &RecordId, coord: u64) -> PathBuf {
        self.shard_dir(coord).join(format!("{}.rec", id.as_str()))
    }

    /// Writes `record` atomically: encode, write to a sibling temp file,
    /// fsync, rename over the target (spec §4.3 "Writes are atomic").
    pub fn write(&self, record: &Record) -> Result<()> {
        let coord = self.coordinate_for(&record.id);
        let dir = self.shard_dir(coord);
        fs::create_dir_all(&dir)?;
        let target = self.record_path(&record.id, coord);
        let tmp = dir.join(format!("{}.rec.tmp", record.id.as_str()));
        let encoded = frame::encode(record).map_err(|e| Error::Corrupt(e.to_string()))?;
        {
            let file = File::create(&tmp)?;
            use std::io::Write;
            let mut file = file;
            file.write_all(&encoded)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &target)?;
        trace!(id = %record.id, coord, "wrote shard record");
        Ok(())
    }

    /// Reads and decodes the record at `id`, known to live at `coord`.
    pub fn read(&self, id: &RecordId, coord: u64) -> Result<Record> {
        let path = self.record_path(id, coord);
        let bytes = fs::read(&path).map_err(|_| Error::not_found(id))?;
        let mut cursor = Cursor::new(bytes.as_slice());
        let record: Record = frame::decode_one(&mut cursor)
            .map_err(|e| Error::Corrupt(format!("shard file for {id}: {e}")))?
            .ok_or_else(|| Error::Corrupt(format!("empty shard file for {id}")))?;
        Ok(record)
    }

    /// Removes the shard file for `id` at `coord`. Idempotent: a missing
    /// file is not an error (the store-level `delete` does its own
    /// idempotence bookkeeping via the index).
    pub fn delete(&self, id: &RecordId, coord: u64) -> Result<()> {
        let path = self.record_path(id, coord);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::from(e)),
        }
    }

    pub fn exists(&self, id: &RecordId, coord: u64) -> bool {
        self.record_path(id, coord).exists()
    }

    /// Lists every record id physically present under `coord`'s shard
    /// directory — used by the compactor to find unreferenced files.
    pub fn list_shard_ids(&self, coord: u64) -> Result<Vec<RecordId>> {
        let dir = self.shard_dir(coord);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("rec") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(RecordId::new(stem));
                }
            }
        }
        Ok(ids)
    }

    /// Lists every shard coordinate directory present on disk.
    pub fn list_shard_coordinates(&self) -> Result<Vec<u64>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut coords = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some((start, _)) = name.split_once('-') {
                        if let Ok(start) = start.parse::<u64>() {
                            coords.push(start / self.shard_width);
                        }
                    }
                }
            }
        }
        coords.sort_unstable();
        Ok(coords)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
