//! # Docvault
//!
//! Core storage and ingestion engine for a document-management service: a
//! sharded, write-ahead-logged record store, a pluggable object-storage
//! backend, and a concurrent upload pipeline with adaptive worker scaling.
//!
//! This crate is a thin facade — internal crates (`durability`, `storage`,
//! `concurrency`, `objectstore`, `ingest`, `engine`) are not exposed as
//! separate dependencies to downstream users; only the surface re-exported
//! here is stable.
//!
//! # Quick start
//!
//! ```no_run
//! use docvault::{LocalFsStore, ObjectStore, Record, RecordId, RecordStatus, RecordStore, StoreConfig};
//! use std::sync::Arc;
//!
//! fn main() -> docvault::Result<()> {
//!     let store = RecordStore::open("./data", StoreConfig::default())?;
//!     let id = store.allocate_id();
//!     let record = Record::new_uploading(id.clone(), "report.pdf", "deadbeef", 4096, "invoices", "payloads/x", chrono::Utc::now());
//!     store.create(record, true)?;
//!     let fetched = store.get(&id)?;
//!     assert_eq!(fetched.status, RecordStatus::Uploading);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! | Layer | Responsibility |
//! |---|---|
//! | [`RecordStore`] | Sharded, WAL-backed, cached record store (C3–C7) |
//! | [`rank_by_similarity`](RecordStore::rank_by_similarity) | Cosine-similarity ranking over stored embeddings (C12) |
//! | [`ObjectStore`] | Unified put/get/delete/signed-url contract over local FS, S3-compatible, or hosted backends (C8) |
//! | [`IngestionQueue`] + [`WorkerPool`] + [`UploadProcessor`] | Bounded queue, adaptively-scaled worker pool, and per-task upload processor (C9–C11) |
//! | [`verify`], [`compact`], [`recover`] | Library entry points for the store's maintenance operations (no CLI or process boundary implied) |

pub use docvault_core::{
    folder, shard_coordinate, shard_dir_name, Error, ExtractedValue, IdAllocator,
    ObjectStoreConfig, PoolConfig, Record, RecordId, RecordPatch, RecordStatus, Result,
    ShardCoordinate, StoreConfig,
};
pub use docvault_engine::{recover, verify, ChannelEnrichmentSink, RankedMatch, RecordStore, RecoverReport, VerifyReport};
pub use docvault_ingest::{
    EnrichmentSink, InMemoryPayload, IngestionQueue, PayloadSource, ProcessOutcome, QueueStats,
    RecordSink, TaskId, TaskStatus, UploadProcessor, UploadTask, WorkerPool,
};
pub use docvault_objectstore::{HostedObjectStore, LocalFsStore, ObjectStore, S3CompatibleStore};
pub use docvault_storage::{CacheStats, CompactionReport};

/// Initializes a `tracing` subscriber honoring `RUST_LOG` (defaulting to
/// `info`), for binaries and tests that want structured log output. Safe to
/// call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn facade_exposes_the_full_create_get_path() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        let id = store.allocate_id();
        let record = Record::new_uploading(id.clone(), "a.txt", "ck", 1, "", "p", chrono::Utc::now());
        store.create(record.clone(), true).unwrap();
        assert_eq!(store.get(&id).unwrap(), record);
    }

    #[test]
    fn init_tracing_does_not_panic_when_called_twice() {
        init_tracing();
        init_tracing();
    }
}
