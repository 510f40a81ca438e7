//! The ingestion pipeline: bounded queue, adaptively-scaled worker pool, and
//! the per-task upload processor (spec §4.9–§4.11, C9–C11).

pub mod pool;
pub mod processor;
pub mod queue;
pub mod task;

pub use pool::{target_workers_for, WorkerPool};
pub use processor::{EnrichmentSink, NullEnrichmentSink, ProcessOutcome, RecordSink, UploadProcessor};
pub use queue::{IngestionQueue, QueueStats};
pub use task::{InMemoryPayload, PayloadSource, TaskId, TaskStatus, UploadTask};
