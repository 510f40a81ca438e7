//! Wire format of a single WAL entry (spec §4.2).

use docvault_core::RecordId;
use serde::{Deserialize, Serialize};

/// The mutation an entry records. Corresponds to the record-store write path
/// that must hit the WAL before the index is rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Put,
    Del,
}

/// A single append-only WAL entry: timestamp, operation, record id, shard
/// coordinate, and an optional payload hash — the fields named in spec §4.2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub timestamp_millis: i64,
    pub operation: Operation,
    pub record_id: RecordId,
    pub shard_coordinate: u64,
    pub payload_hash: Option<String>,
}

impl WalEntry {
    pub fn put(
        record_id: RecordId,
        shard_coordinate: u64,
        payload_hash: Option<String>,
        timestamp_millis: i64,
    ) -> Self {
        WalEntry {
            timestamp_millis,
            operation: Operation::Put,
            record_id,
            shard_coordinate,
            payload_hash,
        }
    }

    pub fn del(record_id: RecordId, shard_coordinate: u64, timestamp_millis: i64) -> Self {
        WalEntry {
            timestamp_millis,
            operation: Operation::Del,
            record_id,
            shard_coordinate,
            payload_hash: None,
        }
    }
}
