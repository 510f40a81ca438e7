//! The `UploadTask` work unit carried by the Ingestion Queue (spec §4.9).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use docvault_core::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Opaque identifier for a queued task, distinct from the record id it may
/// eventually produce.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        TaskId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lazily-readable payload handle — a stream is preferred over buffering the
/// whole file in memory (spec §4.9), so callers hand in any source that can
/// produce its bytes on demand.
#[async_trait]
pub trait PayloadSource: Send + Sync {
    async fn read_all(&self) -> Result<Bytes>;
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// In-memory payload source, for small uploads or tests.
pub struct InMemoryPayload(Bytes);

impl InMemoryPayload {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        InMemoryPayload(bytes.into())
    }
}

#[async_trait]
impl PayloadSource for InMemoryPayload {
    async fn read_all(&self) -> Result<Bytes> {
        Ok(self.0.clone())
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.0.len() as u64)
    }
}

/// Per-task terminal/transient status (spec §4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Duplicate,
    Retrying,
}

/// A pending or in-flight unit of upload work.
pub struct UploadTask {
    pub id: TaskId,
    pub filename: String,
    pub folder: String,
    pub declared_checksum: Option<String>,
    pub payload: Arc<dyn PayloadSource>,
    pub attempt: usize,
    pub next_eligible_at: DateTime<Utc>,
    pub status: TaskStatus,
    /// Populated once the task resolves to a record id (new or duplicate).
    pub result_record_id: Option<docvault_core::RecordId>,
}

impl UploadTask {
    pub fn new(
        id: TaskId,
        filename: impl Into<String>,
        folder: impl Into<String>,
        declared_checksum: Option<String>,
        payload: Arc<dyn PayloadSource>,
        now: DateTime<Utc>,
    ) -> Self {
        UploadTask {
            id,
            filename: filename.into(),
            folder: folder.into(),
            declared_checksum,
            payload,
            attempt: 0,
            next_eligible_at: now,
            status: TaskStatus::Pending,
            result_record_id: None,
        }
    }
}
