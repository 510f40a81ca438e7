//! The Record data model (spec §3).

use crate::id::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of a record (spec §3 "Lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Uploading,
    Ready,
    Processing,
    Completed,
    Failed,
}

/// A free-form extracted field value — string or number, per spec §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractedValue {
    Text(String),
    Number(f64),
}

/// The unit of storage. See spec §3 for the full field contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub filename: String,
    pub checksum: String,
    pub size: u64,
    pub folder: String,
    pub status: RecordStatus,
    pub payload_ref: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub summary: Option<String>,
    pub markdown_ref: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub extracted_fields: HashMap<String, ExtractedValue>,
}

impl Record {
    /// Builds a fresh record in `Uploading` status, as created by the Upload
    /// Processor's first step before payload and metadata are durable.
    pub fn new_uploading(
        id: RecordId,
        filename: impl Into<String>,
        checksum: impl Into<String>,
        size: u64,
        folder: impl Into<String>,
        payload_ref: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Record {
            id,
            filename: filename.into(),
            checksum: checksum.into(),
            size,
            folder: crate::folder::normalize(&folder.into()),
            status: RecordStatus::Uploading,
            payload_ref: payload_ref.into(),
            created_at: now,
            updated_at: now,
            summary: None,
            markdown_ref: None,
            tags: Vec::new(),
            embedding: None,
            extracted_fields: HashMap::new(),
        }
    }
}

/// Partial update over a record's mutable fields (spec §4.7 `update`).
/// `None` fields are left untouched; this is how `update(id, ∅)` stays a
/// true no-op rather than a status churn.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub status: Option<RecordStatus>,
    pub summary: Option<Option<String>>,
    pub markdown_ref: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub embedding: Option<Option<Vec<f32>>>,
    pub extracted_fields: Option<HashMap<String, ExtractedValue>>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.summary.is_none()
            && self.markdown_ref.is_none()
            && self.tags.is_none()
            && self.embedding.is_none()
            && self.extracted_fields.is_none()
    }

    /// Applies the patch to `record`, bumping `updated_at` only if the patch
    /// carries a real change.
    pub fn apply(self, record: &mut Record, now: DateTime<Utc>) {
        if self.is_empty() {
            return;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(summary) = self.summary {
            record.summary = summary;
        }
        if let Some(markdown_ref) = self.markdown_ref {
            record.markdown_ref = markdown_ref;
        }
        if let Some(tags) = self.tags {
            record.tags = tags;
        }
        if let Some(embedding) = self.embedding {
            record.embedding = embedding;
        }
        if let Some(extracted_fields) = self.extracted_fields {
            record.extracted_fields = extracted_fields;
        }
        record.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: DateTime<Utc>) -> Record {
        Record::new_uploading(
            RecordId::new("1"),
            "a.txt",
            "deadbeef",
            10,
            "a/b",
            "payloads/1",
            now,
        )
    }

    #[test]
    fn empty_patch_is_a_true_noop() {
        let now = Utc::now();
        let mut r = sample(now);
        let before = r.clone();
        let later = now + chrono::Duration::seconds(5);
        RecordPatch::default().apply(&mut r, later);
        assert_eq!(r, before);
    }

    #[test]
    fn patch_updates_touched_fields_only() {
        let now = Utc::now();
        let mut r = sample(now);
        let later = now + chrono::Duration::seconds(5);
        let patch = RecordPatch {
            status: Some(RecordStatus::Completed),
            summary: Some(Some("a summary".into())),
            ..Default::default()
        };
        patch.apply(&mut r, later);
        assert_eq!(r.status, RecordStatus::Completed);
        assert_eq!(r.summary.as_deref(), Some("a summary"));
        assert_eq!(r.updated_at, later);
        assert!(r.tags.is_empty());
    }

    #[test]
    fn folder_is_normalized_on_construction() {
        let r = sample(Utc::now());
        assert_eq!(r.folder, "a/b");
    }
}
