//! Durability layer: the advisory file lock (C1) and the write-ahead log (C2).
//!
//! Neither module knows about records or shards — they operate on raw
//! entries and bytes, kept generic so the storage crate can build the
//! index/shard reconciliation on top without this crate depending back on it.

pub mod lock;
pub mod wal;

pub use lock::{acquire, LockHandle, STALE_GRACE_PERIOD};
