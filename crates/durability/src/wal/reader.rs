//! Replay and truncation of WAL segments (spec §4.2 "Replay").

use super::frame;
use super::record::WalEntry;
use super::writer::list_segments;
use docvault_core::Result;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Why replay of a segment stopped short of its end — always benign; a
/// partial tail is the expected shape of a crash between WAL append calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStopReason {
    EndOfFile,
    TornTail,
}

pub struct ReplayResult {
    pub entries: Vec<WalEntry>,
    pub stop_reason: ReadStopReason,
    pub segments_read: usize,
}

/// Replays every segment in `dir` in order, concatenating their entries.
/// A torn tail in the last segment stops that segment's replay but does not
/// fail the call — the entries decoded so far are returned.
pub fn replay(dir: &Path) -> Result<ReplayResult> {
    let segments = list_segments(dir)?;
    let mut entries = Vec::new();
    let mut stop_reason = ReadStopReason::EndOfFile;
    for (number, path) in &segments {
        let bytes = fs::read(path)?;
        let (decoded, torn) = frame::decode_all_best_effort::<WalEntry>(&bytes);
        entries.extend(decoded);
        if torn {
            warn!(segment = number, "torn tail found during WAL replay");
            stop_reason = ReadStopReason::TornTail;
        }
    }
    info!(
        segments = segments.len(),
        entries = entries.len(),
        "replayed WAL"
    );
    Ok(ReplayResult {
        entries,
        stop_reason,
        segments_read: segments.len(),
    })
}

/// Information about how much of the WAL directory was cleared.
pub struct TruncateInfo {
    pub segments_removed: usize,
}

/// Removes every segment file in `dir`. Called after a successful
/// replay-and-reconcile pass (compactor step 1, spec §4.6) or after the
/// index has been rewritten to reflect all replayed entries.
pub fn truncate(dir: &Path) -> Result<TruncateInfo> {
    let segments = list_segments(dir)?;
    for (_, path) in &segments {
        fs::remove_file(path)?;
    }
    Ok(TruncateInfo {
        segments_removed: segments.len(),
    })
}
