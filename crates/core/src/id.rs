//! Record identifiers and the shard-coordinate function (spec §4.3).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque, globally-unique record identifier.
///
/// Ids allocated by [`IdAllocator`] are monotonic and numeric-looking (so the
/// shard-coordinate function can parse them directly), but the type accepts
/// any string — ids from prior histories need not be numeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(raw: impl Into<String>) -> Self {
        RecordId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ordinal used for shard-coordinate derivation. Numeric ids use
    /// their own value; non-numeric ids fall back to a stable hash of the id
    /// modulo a large power of ten (spec §4.3 C3).
    pub fn ord(&self) -> u64 {
        if let Ok(n) = self.0.parse::<u64>() {
            return n;
        }
        u64::from(crc32fast::hash(self.0.as_bytes()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// Numeric shard bucket a record's id falls into, per spec §4.3:
/// `⌊id_ord / shard_width⌋`.
pub type ShardCoordinate = u64;

/// Computes the shard coordinate for a given id under a given shard width.
///
/// `shard_width` must be a power of ten in `[100, 10_000]`; callers validate
/// this at config-construction time (see [`crate::config::StoreConfig`]).
pub fn shard_coordinate(id: &RecordId, shard_width: u64) -> ShardCoordinate {
    id.ord() / shard_width
}

/// Directory name for a shard coordinate, e.g. coordinate `0` with width
/// `1000` becomes `000000-000999`, matching the persisted layout in spec §6.
pub fn shard_dir_name(coord: ShardCoordinate, shard_width: u64) -> String {
    let start = coord * shard_width;
    let end = start + shard_width - 1;
    format!("{start:06}-{end:06}")
}

/// Monotonic id allocator. Ids are a zero-padded decimal counter seeded from
/// the index's `last_id_ord` on store startup, which keeps allocation
/// monotonic across restarts without requiring a centralized sequence.
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    pub fn starting_at(last_id_ord: u64) -> Self {
        IdAllocator {
            next: AtomicU64::new(last_id_ord + 1),
        }
    }

    pub fn allocate(&self) -> RecordId {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        RecordId::new(format!("{n:020}"))
    }

    pub fn peek_next(&self) -> u64 {
        self.next.load(Ordering::SeqCst)
    }
}
