//! Property tests for the Record Store's core invariants and round-trip
//! laws (spec §8).

use chrono::Utc;
use docvault_core::{Record, RecordPatch, RecordStatus, StoreConfig};
use docvault_engine::store::RecordStore;
use proptest::prelude::*;
use tempfile::tempdir;

fn arb_folder() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-zA-Z0-9]{1,6}", 0..4).prop_map(|segments| segments.join("/"))
}

fn arb_tags() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z]{1,8}", 0..5)
}

proptest! {
    /// Invariant 4: a successful `create(r)` followed by `get(r.id)` returns
    /// a record equal to `r` modulo server-assigned timestamps, for any
    /// filename/checksum/size/folder/tags combination.
    #[test]
    fn create_then_get_matches_modulo_timestamps(
        filename in "[a-zA-Z0-9._]{1,20}",
        checksum in "[a-f0-9]{8,64}",
        size in 0_u64..1_000_000,
        folder in arb_folder(),
        tags in arb_tags(),
    ) {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        let id = store.allocate_id();
        let mut record = Record::new_uploading(id.clone(), &filename, &checksum, size, &folder, "payloads/x", Utc::now());
        record.tags = tags.clone();
        store.create(record.clone(), true).unwrap();

        let fetched = store.get(&id).unwrap();
        prop_assert_eq!(fetched.id, record.id);
        prop_assert_eq!(fetched.filename, record.filename);
        prop_assert_eq!(fetched.checksum, record.checksum);
        prop_assert_eq!(fetched.size, record.size);
        prop_assert_eq!(fetched.folder, record.folder);
        prop_assert_eq!(fetched.tags, record.tags);
    }

    /// Round-trip law: `create(r); find_by_checksum(r.checksum) == r.id`.
    #[test]
    fn create_then_find_by_checksum_resolves_the_same_id(checksum in "[a-f0-9]{8,64}") {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        let id = store.allocate_id();
        let record = Record::new_uploading(id.clone(), "a.txt", &checksum, 1, "", "payloads/x", Utc::now());
        store.create(record, true).unwrap();
        prop_assert_eq!(store.find_by_checksum(&checksum).unwrap(), id);
    }

    /// Round-trip law: `delete(id); delete(id)` returns `NotFound` on the
    /// second call, for any folder/checksum the record was created with.
    #[test]
    fn double_delete_is_not_found_on_second_call(folder in arb_folder(), checksum in "[a-f0-9]{8,64}") {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        let id = store.allocate_id();
        let record = Record::new_uploading(id.clone(), "a.txt", &checksum, 1, &folder, "payloads/x", Utc::now());
        store.create(record, true).unwrap();

        store.delete(&id).unwrap();
        let second = store.delete(&id);
        prop_assert!(matches!(second, Err(docvault_core::Error::NotFound(_))));
    }

    /// `update(id, ∅)` never changes `updated_at` or any other field,
    /// regardless of what the record looked like beforehand.
    #[test]
    fn empty_patch_is_always_a_true_noop(tags in arb_tags(), folder in arb_folder()) {
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        let id = store.allocate_id();
        let mut record = Record::new_uploading(id.clone(), "a.txt", "ck", 1, &folder, "payloads/x", Utc::now());
        record.tags = tags;
        store.create(record.clone(), true).unwrap();

        let updated = store.update(&id, RecordPatch::default()).unwrap();
        prop_assert_eq!(updated, record);
    }

    /// Restarting the store (closing and reopening against the same
    /// directory) reproduces exactly the set of ids that were durably
    /// created before the restart — simulating the "prefix of the sequence"
    /// equivalence of invariant 3 for the no-crash case.
    #[test]
    fn reopening_preserves_every_created_record(
        checksums in proptest::collection::vec("[a-f0-9]{8,16}", 1..8),
    ) {
        let dir = tempdir().unwrap();
        let mut ids = Vec::new();
        {
            let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
            for checksum in &checksums {
                let id = store.allocate_id();
                let record = Record::new_uploading(id.clone(), "a.txt", checksum, 1, "", "payloads/x", Utc::now());
                store.create(record, true).unwrap();
                ids.push(id);
            }
        }
        let reopened = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        for id in &ids {
            prop_assert!(reopened.get(id).is_ok());
        }
    }

    /// Invariant 5: any record with a present embedding has a length equal
    /// to the configured embedding dimension, or the write is rejected.
    #[test]
    fn embedding_dimension_mismatch_is_rejected(
        dim_1 in 1_usize..16,
        dim_2 in 1_usize..16,
    ) {
        prop_assume!(dim_1 != dim_2);
        let dir = tempdir().unwrap();
        let store = RecordStore::open(dir.path(), StoreConfig::default()).unwrap();
        let id = store.allocate_id();
        let mut record = Record::new_uploading(id.clone(), "a.txt", "ck", 1, "", "payloads/x", Utc::now());
        record.embedding = Some(vec![0.0; dim_1]);
        store.create(record, true).unwrap();

        let patch = RecordPatch {
            embedding: Some(Some(vec![0.0; dim_2])),
            ..Default::default()
        };
        let result = store.update(&id, patch);
        prop_assert!(matches!(result, Err(docvault_core::Error::Inconsistent(_))));
    }
}
