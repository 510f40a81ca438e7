//! Per-task work unit: checksum, dedup, persist payload, persist record,
//! enrichment handoff (spec §4.11, C11).
//!
//! The processor is decoupled from the concrete record store: it depends
//! only on the narrow [`RecordSink`]/[`EnrichmentSink`] traits, which the
//! engine crate implements against its real `RecordStore` — "object
//! polymorphism... becomes a narrow interface" (design note in SPEC_FULL.md §5).

use crate::task::{TaskId, UploadTask};
use async_trait::async_trait;
use docvault_core::{Error, RecordId, Result};
use docvault_objectstore::ObjectStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::warn;

/// What the Upload Processor needs from the Record Store (spec §4.7),
/// narrowed to the operations step 2/3/4 actually call.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn find_by_checksum(&self, checksum: &str) -> Result<Option<RecordId>>;

    /// Allocates a fresh id and persists a record in `ready` status pointing
    /// at `payload_ref`, enforcing checksum uniqueness. Must fail with
    /// `Error::Duplicate` on id collision so the processor can retry with a
    /// new id, and with `Error::ChecksumConflict` if a concurrent creator won
    /// the same checksum first, so the processor can fall back to the
    /// winner's id instead of minting a second record (spec §4.11 step 4,
    /// §8 "Concurrent `create` calls with the same checksum yield exactly
    /// one successful record").
    async fn create_ready(
        &self,
        filename: &str,
        checksum: &str,
        size: u64,
        folder: &str,
        payload_ref: &str,
    ) -> Result<RecordId>;
}

/// Publish-only handoff boundary to the external enrichment collaborator
/// (spec §4.11 step 5, §9 "Async/await... collapses to a message-passing
/// boundary"). A failed handoff does not fail the task.
#[async_trait]
pub trait EnrichmentSink: Send + Sync {
    async fn notify(&self, record_id: &RecordId, payload_ref: &str);
}

/// Terminal or transient outcome of processing one task.
pub enum ProcessOutcome {
    Succeeded(RecordId),
    Duplicate(RecordId),
    Transient(Error),
    Terminal(Error),
}

pub struct UploadProcessor {
    records: Arc<dyn RecordSink>,
    objects: Arc<dyn ObjectStore>,
    enrichment: Arc<dyn EnrichmentSink>,
    payload_key_prefix: String,
}

impl UploadProcessor {
    pub fn new(
        records: Arc<dyn RecordSink>,
        objects: Arc<dyn ObjectStore>,
        enrichment: Arc<dyn EnrichmentSink>,
    ) -> Self {
        UploadProcessor {
            records,
            objects,
            enrichment,
            payload_key_prefix: "payloads".into(),
        }
    }

    fn payload_key(&self, task_id: &TaskId) -> String {
        format!("{}/{}", self.payload_key_prefix, task_id.as_str())
    }

    /// A concurrent creator won the race on `checksum` before this task's
    /// own `create_ready` call landed. Re-queries the winner's id and
    /// reports this task as `duplicate` rather than failing it (spec §8
    /// "Concurrent `create` calls with the same checksum yield exactly one
    /// successful record; the others receive the duplicate id or
    /// `ChecksumConflict`").
    async fn resolve_checksum_conflict(&self, checksum: &str) -> ProcessOutcome {
        match self.records.find_by_checksum(checksum).await {
            Ok(Some(existing)) => ProcessOutcome::Duplicate(existing),
            Ok(None) => ProcessOutcome::Transient(Error::Backend(format!(
                "checksum conflict reported for {checksum} but no record found on re-query"
            ))),
            Err(e) if e.is_transient() => ProcessOutcome::Transient(e),
            Err(e) => ProcessOutcome::Terminal(e),
        }
    }

    /// Runs the five steps of spec §4.11 against `task`.
    pub async fn process(&self, task: &mut UploadTask) -> ProcessOutcome {
        // Step 1: checksum.
        let bytes = match task.payload.read_all().await {
            Ok(bytes) => bytes,
            Err(e) => return ProcessOutcome::Terminal(e),
        };
        let computed_checksum = hex_sha256(&bytes);

        if let Some(declared) = &task.declared_checksum {
            if declared != &computed_checksum {
                return ProcessOutcome::Terminal(Error::ChecksumMismatch {
                    declared: declared.clone(),
                    computed: computed_checksum,
                });
            }
        }

        // Step 2: dedup.
        match self.records.find_by_checksum(&computed_checksum).await {
            Ok(Some(existing)) => return ProcessOutcome::Duplicate(existing),
            Ok(None) => {}
            Err(e) if e.is_transient() => return ProcessOutcome::Transient(e),
            Err(e) => return ProcessOutcome::Terminal(e),
        }

        // Step 3: persist payload under a key derived from this task.
        let payload_key = self.payload_key(&task.id);
        if let Err(e) = self.objects.put(&payload_key, bytes.clone()).await {
            return ProcessOutcome::Transient(e);
        }

        // Step 4: persist record; retry once with a fresh payload key on id
        // collision (spec §4.11 step 4).
        let size = bytes.len() as u64;
        let create_result = self
            .records
            .create_ready(&task.filename, &computed_checksum, size, &task.folder, &payload_key)
            .await;

        let (record_id, final_payload_key) = match create_result {
            Ok(id) => (id, payload_key),
            Err(Error::Duplicate(_)) => {
                let retry_key = format!("{payload_key}-retry");
                if let Err(e) = self.objects.put(&retry_key, bytes).await {
                    return ProcessOutcome::Transient(e);
                }
                match self
                    .records
                    .create_ready(&task.filename, &computed_checksum, size, &task.folder, &retry_key)
                    .await
                {
                    Ok(id) => (id, retry_key),
                    Err(Error::ChecksumConflict(_)) => {
                        return self.resolve_checksum_conflict(&computed_checksum).await;
                    }
                    Err(e) if e.is_transient() => return ProcessOutcome::Transient(e),
                    Err(e) => return ProcessOutcome::Terminal(e),
                }
            }
            Err(Error::ChecksumConflict(_)) => {
                return self.resolve_checksum_conflict(&computed_checksum).await;
            }
            Err(e) if e.is_transient() => return ProcessOutcome::Transient(e),
            Err(e) => return ProcessOutcome::Terminal(e),
        };

        // Step 5: hand off enrichment; not retried by this pipeline.
        self.enrichment.notify(&record_id, &final_payload_key).await;

        ProcessOutcome::Succeeded(record_id)
    }
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// An `EnrichmentSink` that logs and drops — used when no external
/// enrichment collaborator is wired up (e.g. local dev, tests).
pub struct NullEnrichmentSink;

#[async_trait]
impl EnrichmentSink for NullEnrichmentSink {
    async fn notify(&self, record_id: &RecordId, payload_ref: &str) {
        warn!(%record_id, payload_ref, "no enrichment sink configured; handoff dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{InMemoryPayload, TaskId, UploadTask};
    use bytes::Bytes;
    use chrono::Utc;
    use docvault_objectstore::LocalFsStore;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use tempfile::tempdir;

    struct FakeRecordSink {
        by_checksum: Mutex<HashMap<String, RecordId>>,
        next_id: Mutex<u64>,
        fail_create_once: Mutex<bool>,
    }

    impl FakeRecordSink {
        fn new() -> Self {
            FakeRecordSink {
                by_checksum: Mutex::new(HashMap::new()),
                next_id: Mutex::new(1),
                fail_create_once: Mutex::new(false),
            }
        }
    }

    #[async_trait]
    impl RecordSink for FakeRecordSink {
        async fn find_by_checksum(&self, checksum: &str) -> Result<Option<RecordId>> {
            Ok(self.by_checksum.lock().get(checksum).cloned())
        }

        async fn create_ready(
            &self,
            _filename: &str,
            checksum: &str,
            _size: u64,
            _folder: &str,
            _payload_ref: &str,
        ) -> Result<RecordId> {
            let mut fail_once = self.fail_create_once.lock();
            if *fail_once {
                *fail_once = false;
                return Err(Error::Duplicate("collision".into()));
            }
            let mut next_id = self.next_id.lock();
            let id = RecordId::new(next_id.to_string());
            *next_id += 1;
            self.by_checksum.lock().insert(checksum.to_string(), id.clone());
            Ok(id)
        }
    }

    struct NoopEnrichment;
    #[async_trait]
    impl EnrichmentSink for NoopEnrichment {
        async fn notify(&self, _record_id: &RecordId, _payload_ref: &str) {}
    }

    #[tokio::test]
    async fn successful_upload_persists_and_notifies() {
        let dir = tempdir().unwrap();
        let objects = Arc::new(LocalFsStore::new(dir.path()));
        let records = Arc::new(FakeRecordSink::new());
        let processor = UploadProcessor::new(records, objects, Arc::new(NoopEnrichment));

        let mut task = UploadTask::new(
            TaskId::new("t1"),
            "a.txt",
            "",
            None,
            Arc::new(InMemoryPayload::new(Bytes::from_static(b"hello"))),
            Utc::now(),
        );
        match processor.process(&mut task).await {
            ProcessOutcome::Succeeded(_) => {}
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn duplicate_checksum_is_reported_without_new_record() {
        let dir = tempdir().unwrap();
        let objects = Arc::new(LocalFsStore::new(dir.path()));
        let records = Arc::new(FakeRecordSink::new());
        let processor = UploadProcessor::new(records.clone(), objects, Arc::new(NoopEnrichment));

        let mut first = UploadTask::new(
            TaskId::new("t1"),
            "a.txt",
            "",
            None,
            Arc::new(InMemoryPayload::new(Bytes::from_static(b"same"))),
            Utc::now(),
        );
        let first_id = match processor.process(&mut first).await {
            ProcessOutcome::Succeeded(id) => id,
            _ => panic!("expected success"),
        };

        let mut second = UploadTask::new(
            TaskId::new("t2"),
            "b.txt",
            "",
            None,
            Arc::new(InMemoryPayload::new(Bytes::from_static(b"same"))),
            Utc::now(),
        );
        match processor.process(&mut second).await {
            ProcessOutcome::Duplicate(id) => assert_eq!(id, first_id),
            _ => panic!("expected duplicate"),
        }
    }

    #[tokio::test]
    async fn declared_checksum_mismatch_is_terminal() {
        let dir = tempdir().unwrap();
        let objects = Arc::new(LocalFsStore::new(dir.path()));
        let records = Arc::new(FakeRecordSink::new());
        let processor = UploadProcessor::new(records, objects, Arc::new(NoopEnrichment));

        let mut task = UploadTask::new(
            TaskId::new("t1"),
            "a.txt",
            "",
            Some("wrongchecksum".into()),
            Arc::new(InMemoryPayload::new(Bytes::from_static(b"hello"))),
            Utc::now(),
        );
        match processor.process(&mut task).await {
            ProcessOutcome::Terminal(Error::ChecksumMismatch { .. }) => {}
            _ => panic!("expected checksum mismatch"),
        }
    }

    #[tokio::test]
    async fn id_collision_retries_once_with_fresh_key() {
        let dir = tempdir().unwrap();
        let objects = Arc::new(LocalFsStore::new(dir.path()));
        let records = Arc::new(FakeRecordSink::new());
        *records.fail_create_once.lock() = true;
        let processor = UploadProcessor::new(records, objects, Arc::new(NoopEnrichment));

        let mut task = UploadTask::new(
            TaskId::new("t1"),
            "a.txt",
            "",
            None,
            Arc::new(InMemoryPayload::new(Bytes::from_static(b"hello"))),
            Utc::now(),
        );
        match processor.process(&mut task).await {
            ProcessOutcome::Succeeded(_) => {}
            _ => panic!("expected eventual success after one retry"),
        }
    }
}
