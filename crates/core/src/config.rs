//! Configuration surface (spec §6 "Configuration"): explicit config structs
//! with `Default` impls rather than a singleton.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration recognized by the Record Store (shard/index/WAL/cache/compaction).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Shard bucket size. Must be a power of ten in `[100, 10_000]`.
    pub shard_width: u64,
    /// Mutations between index rewrites.
    pub index_rewrite_interval: u64,
    /// Mutations per WAL fsync.
    pub wal_fsync_interval: u64,
    /// Mutations between compaction passes.
    pub compaction_interval: u64,
    /// Bounded LRU cache capacity, in decoded records.
    pub cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            shard_width: 1000,
            index_rewrite_interval: 100,
            wal_fsync_interval: 50,
            compaction_interval: 10_000,
            cache_capacity: 5_000,
        }
    }
}

impl StoreConfig {
    /// Validates the config, matching §4.3's shard-width constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.shard_width < 100 || self.shard_width > 10_000 {
            return Err(format!(
                "shard_width {} out of range [100, 10000]",
                self.shard_width
            ));
        }
        let mut w = self.shard_width;
        while w > 1 {
            if w % 10 != 0 {
                return Err(format!("shard_width {} is not a power of ten", self.shard_width));
            }
            w /= 10;
        }
        if self.index_rewrite_interval < 100 {
            return Err("index_rewrite_interval must be >= 100".into());
        }
        Ok(())
    }
}

/// Configuration for the Worker Pool's adaptive scaling and retry policy
/// (spec §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub worker_min: usize,
    pub worker_max: usize,
    /// Minimum interval between scaling decisions.
    pub scaling_tick: Duration,
    /// Retry delay sequence, in seconds.
    pub retry_delays_secs: Vec<u64>,
    /// High-water mark for the ingestion queue.
    pub queue_high_water_mark: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            worker_min: 5,
            worker_max: 1000,
            scaling_tick: Duration::from_secs(1),
            retry_delays_secs: vec![1, 2, 4, 8],
            queue_high_water_mark: 10_000,
        }
    }
}

impl PoolConfig {
    pub fn retry_delay(&self, attempt: usize) -> Option<Duration> {
        self.retry_delays_secs
            .get(attempt)
            .map(|secs| Duration::from_secs(*secs))
    }
}

/// Which object storage backend is active (spec §6 `object_backend`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObjectStoreConfig {
    Local { root: std::path::PathBuf },
    S3Compatible {
        endpoint: Option<String>,
        bucket: String,
        region: String,
        prefix: Option<String>,
    },
    Hosted { base_url: String, auth_token: Option<String> },
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        ObjectStoreConfig::Local {
            root: std::path::PathBuf::from("./payloads"),
        }
    }
}
