//! Bounded in-memory cache of decoded records (spec §4.5, C5).

use docvault_core::{Record, RecordId};
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time hit/miss counters, exposed for a stats surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe LRU cache of hot records, default capacity 5,000 (spec §4.5).
///
/// Guarded by its own mutex, disjoint from the global lock (spec §5
/// "Shared-resource policy") — cache reads/writes never contend with
/// WAL/index writers.
pub struct RecordCache {
    inner: Mutex<LruCache<RecordId, Record>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecordCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        RecordCache {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Read-through lookup; clones the cached record since callers own their copy.
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        let mut guard = self.inner.lock();
        match guard.get(id) {
            Some(record) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(record.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Populates the cache on a successful `put`/`update`, always replacing
    /// any prior entry so a stale version is never observed (spec §4.5
    /// eviction contract).
    pub fn put(&self, record: Record) {
        self.inner.lock().put(record.id.clone(), record);
    }

    pub fn invalidate(&self, id: &RecordId) {
        self.inner.lock().pop(id);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(id: &str) -> Record {
        Record::new_uploading(RecordId::new(id), "a.txt", "ck", 1, "", "p", Utc::now())
    }

    #[test]
    fn put_then_get_hits() {
        let cache = RecordCache::new(2);
        cache.put(sample("1"));
        assert!(cache.get(&RecordId::new("1")).is_some());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn miss_on_absent_id() {
        let cache = RecordCache::new(2);
        assert!(cache.get(&RecordId::new("missing")).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn eviction_respects_capacity() {
        let cache = RecordCache::new(1);
        cache.put(sample("1"));
        cache.put(sample("2"));
        assert!(cache.get(&RecordId::new("1")).is_none());
        assert!(cache.get(&RecordId::new("2")).is_some());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = RecordCache::new(2);
        cache.put(sample("1"));
        cache.invalidate(&RecordId::new("1"));
        assert!(cache.get(&RecordId::new("1")).is_none());
    }

    #[test]
    fn update_never_leaves_stale_version_visible() {
        let cache = RecordCache::new(2);
        let mut r = sample("1");
        cache.put(r.clone());
        r.filename = "renamed.txt".into();
        cache.put(r.clone());
        assert_eq!(cache.get(&RecordId::new("1")).unwrap().filename, "renamed.txt");
    }
}
