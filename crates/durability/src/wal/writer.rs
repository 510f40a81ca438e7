//! Append-only WAL writer with segment rotation (spec §4.2, C2).

use super::config::WalConfig;
use super::frame;
use super::mode::DurabilityMode;
use super::record::WalEntry;
use docvault_core::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Running counters exposed for the compactor's metrics emission (spec §4.6 step 5).
#[derive(Debug, Clone, Copy, Default)]
pub struct WalCounters {
    pub entries_written: u64,
    pub bytes_written: u64,
    pub syncs: u64,
    pub segments_rotated: u64,
}

struct OpenSegment {
    number: u64,
    file: BufWriter<File>,
    size: u64,
}

/// Writes WAL entries to rotating segment files under `wal/` (spec §6 layout).
pub struct WalWriter {
    dir: PathBuf,
    config: WalConfig,
    segment: OpenSegment,
    writes_since_sync: u64,
    last_sync_at: Instant,
    counters: WalCounters,
}

impl WalWriter {
    /// Opens the latest segment in `dir` (creating the directory and a first
    /// segment if none exists) and resumes appending to it.
    pub fn open(dir: &Path, config: WalConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| docvault_core::Error::Corrupt(e.to_string()))?;
        fs::create_dir_all(dir)?;
        let number = find_latest_segment(dir)?.unwrap_or(1);
        let path = segment_path(dir, number);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let size = file.metadata()?.len();
        Ok(WalWriter {
            dir: dir.to_path_buf(),
            config,
            segment: OpenSegment {
                number,
                file: BufWriter::new(file),
                size,
            },
            writes_since_sync: 0,
            last_sync_at: Instant::now(),
            counters: WalCounters::default(),
        })
    }

    pub fn counters(&self) -> WalCounters {
        self.counters
    }

    /// Appends `entry`, rotating to a fresh segment first if it would not
    /// fit, then applying the configured sync policy.
    pub fn append(&mut self, entry: &WalEntry) -> Result<()> {
        let framed = frame::encode(entry)?;
        if self.segment.size + framed.len() as u64 > self.config.segment_size
            && self.segment.size > 0
        {
            self.rotate_segment()?;
        }
        self.segment.file.write_all(&framed)?;
        self.segment.size += framed.len() as u64;
        self.writes_since_sync += 1;
        self.counters.entries_written += 1;
        self.counters.bytes_written += framed.len() as u64;
        self.maybe_sync()?;
        Ok(())
    }

    fn maybe_sync(&mut self) -> Result<()> {
        let should_sync = match &self.config.mode {
            DurabilityMode::None => false,
            DurabilityMode::Strict => true,
            DurabilityMode::Batched {
                interval_ms,
                batch_size,
            } => {
                self.writes_since_sync >= *batch_size
                    || self.last_sync_at.elapsed().as_millis() as u64 >= *interval_ms
            }
        };
        if should_sync {
            self.flush()?;
        }
        Ok(())
    }

    /// Flushes buffered writes and fsyncs the current segment.
    pub fn flush(&mut self) -> Result<()> {
        self.segment.file.flush()?;
        self.segment.file.get_ref().sync_data()?;
        self.writes_since_sync = 0;
        self.last_sync_at = Instant::now();
        self.counters.syncs += 1;
        Ok(())
    }

    fn rotate_segment(&mut self) -> Result<()> {
        self.flush()?;
        let next = self.segment.number + 1;
        let path = segment_path(&self.dir, next);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.segment = OpenSegment {
            number: next,
            file: BufWriter::new(file),
            size: 0,
        };
        self.counters.segments_rotated += 1;
        info!(segment = next, "rotated WAL segment");
        Ok(())
    }

    /// Current segment's path, for callers that need to truncate after replay.
    pub fn current_segment_path(&self) -> PathBuf {
        segment_path(&self.dir, self.segment.number)
    }

    pub fn close(mut self) -> Result<()> {
        self.flush()?;
        debug!(path = %self.dir.display(), "closed WAL writer");
        Ok(())
    }
}

pub(crate) fn segment_path(dir: &Path, number: u64) -> PathBuf {
    dir.join(format!("{number:06}.log"))
}

pub fn list_segments(dir: &Path) -> Result<Vec<(u64, PathBuf)>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if let Some(n) = parse_segment_number(&path) {
            out.push((n, path));
        }
    }
    out.sort_by_key(|(n, _)| *n);
    Ok(out)
}

fn find_latest_segment(dir: &Path) -> Result<Option<u64>> {
    Ok(list_segments(dir)?.into_iter().map(|(n, _)| n).max())
}

fn parse_segment_number(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    if path.extension().and_then(|e| e.to_str()) != Some("log") {
        return None;
    }
    stem.parse().ok()
}
