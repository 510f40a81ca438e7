//! Adapters wiring the Record Store (C7) into the ingestion pipeline's
//! narrow `RecordSink`/`EnrichmentSink` interfaces (spec §4.11, §9 "object
//! polymorphism... becomes a narrow interface").

use crate::store::RecordStore;
use async_trait::async_trait;
use chrono::Utc;
use docvault_core::{Error, Record, RecordId, RecordStatus, Result};
use docvault_ingest::{EnrichmentSink, RecordSink};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

#[async_trait]
impl RecordSink for RecordStore {
    async fn find_by_checksum(&self, checksum: &str) -> Result<Option<RecordId>> {
        match self.find_by_checksum(checksum) {
            Ok(id) => Ok(Some(id)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_ready(
        &self,
        filename: &str,
        checksum: &str,
        size: u64,
        folder: &str,
        payload_ref: &str,
    ) -> Result<RecordId> {
        let id = self.allocate_id();
        let now = Utc::now();
        let record = Record {
            id: id.clone(),
            filename: filename.to_string(),
            checksum: checksum.to_string(),
            size,
            folder: docvault_core::folder::normalize(folder),
            status: RecordStatus::Ready,
            payload_ref: payload_ref.to_string(),
            created_at: now,
            updated_at: now,
            summary: None,
            markdown_ref: None,
            tags: Vec::new(),
            embedding: None,
            extracted_fields: HashMap::new(),
        };
        self.create(record, true)?;
        Ok(id)
    }
}

/// A message-passing `EnrichmentSink`: the Upload Processor hands off
/// `(id, payload_ref)` to a channel it does not own and never awaits the
/// other end (spec §9 "Async/await over the AI enrichment step collapses to
/// a message-passing boundary"). A full channel drops the notification with
/// a warning rather than blocking or failing the upload.
pub struct ChannelEnrichmentSink {
    sender: UnboundedSender<(RecordId, String)>,
}

impl ChannelEnrichmentSink {
    pub fn new(sender: UnboundedSender<(RecordId, String)>) -> Self {
        ChannelEnrichmentSink { sender }
    }
}

#[async_trait]
impl EnrichmentSink for ChannelEnrichmentSink {
    async fn notify(&self, record_id: &RecordId, payload_ref: &str) {
        if self
            .sender
            .send((record_id.clone(), payload_ref.to_string()))
            .is_err()
        {
            warn!(%record_id, payload_ref, "enrichment channel closed; handoff dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docvault_core::StoreConfig;
    use tempfile::tempdir;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn record_sink_create_ready_persists_a_ready_record() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        let sink: &dyn RecordSink = &*store;
        let id = sink
            .create_ready("a.txt", "ck1", 5, "docs", "payloads/a")
            .await
            .unwrap();
        let record = store.get(&id).unwrap();
        assert_eq!(record.status, RecordStatus::Ready);
        assert_eq!(record.folder, "docs");
    }

    #[tokio::test]
    async fn record_sink_find_by_checksum_distinguishes_absent_from_error() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        let sink: &dyn RecordSink = &*store;
        let found = sink.find_by_checksum("missing").await.unwrap();
        assert!(found.is_none());

        sink.create_ready("a.txt", "present", 1, "", "p").await.unwrap();
        let found = sink.find_by_checksum("present").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn channel_enrichment_sink_forwards_handoff() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = ChannelEnrichmentSink::new(tx);
        sink.notify(&RecordId::new("1"), "payloads/1").await;
        let (id, payload_ref) = rx.recv().await.unwrap();
        assert_eq!(id, RecordId::new("1"));
        assert_eq!(payload_ref, "payloads/1");
    }

    #[tokio::test]
    async fn channel_enrichment_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = ChannelEnrichmentSink::new(tx);
        sink.notify(&RecordId::new("1"), "payloads/1").await;
    }
}
