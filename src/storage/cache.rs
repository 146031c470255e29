//! Write-back record cache above the key/value store.
//!
//! Puts land in the cache, are marked dirty, and are written through so
//! scans observe them immediately; `flush` re-persists whatever is still
//! marked dirty. Reads serve cache hits or decode from the store and warm
//! the cache. The cache is unbounded — the working set is assumed to fit.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::record::{Key, Record};
use crate::storage::codec;
use crate::storage::kv::{KvStore, RECORD_PREFIX};

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Decoded-record cache with write-through persistence.
pub struct RecordCache {
    kv: Arc<KvStore>,
    records: RwLock<HashMap<Key, Record>>,
    dirty: Mutex<HashSet<Key>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecordCache {
    pub fn new(kv: Arc<KvStore>) -> Self {
        Self {
            kv,
            records: RwLock::new(HashMap::new()),
            dirty: Mutex::new(HashSet::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Stores a record: cache, dirty mark, and write-through to the KV
    /// store. An existing record under the same key is overwritten.
    pub fn put(&self, key: Key, record: Record) -> Result<()> {
        let blob = codec::encode(&record)?;
        self.kv.put(&KvStore::record_key(key), &blob)?;
        self.records.write().insert(key, record);
        self.dirty.lock().insert(key);
        Ok(())
    }

    /// Fetches a record, serving the cache when possible and filling it on
    /// a miss.
    pub fn get(&self, key: Key) -> Result<Record> {
        if let Some(record) = self.records.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(record.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let raw = self
            .kv
            .get(&KvStore::record_key(key))?
            .ok_or_else(|| Error::not_found(format!("record {key}")))?;
        let record: Record = codec::decode(&raw)?;
        self.records.write().insert(key, record.clone());
        Ok(record)
    }

    /// Whether a record exists in the cache or the KV store.
    pub fn contains(&self, key: Key) -> Result<bool> {
        if self.records.read().contains_key(&key) {
            return Ok(true);
        }
        Ok(self.kv.get(&KvStore::record_key(key))?.is_some())
    }

    /// Evicts the record and write-throughs the tombstone.
    pub fn delete(&self, key: Key) -> Result<()> {
        self.records.write().remove(&key);
        self.dirty.lock().remove(&key);
        self.kv.delete(&KvStore::record_key(key))
    }

    /// Persists every dirty record and clears the dirty set. Cached entries
    /// stay resident.
    pub fn flush(&self) -> Result<()> {
        let keys: Vec<Key> = self.dirty.lock().iter().copied().collect();
        for key in &keys {
            let record = match self.records.read().get(key) {
                Some(record) => record.clone(),
                None => continue,
            };
            let blob = codec::encode(&record)?;
            self.kv.put(&KvStore::record_key(*key), &blob)?;
        }
        let mut dirty = self.dirty.lock();
        for key in keys {
            dirty.remove(&key);
        }
        Ok(())
    }

    /// Scans the record prefix and warms the cache with up to `n` records
    /// not already resident. Returns how many were loaded.
    pub fn prefetch(&self, n: usize) -> Result<usize> {
        let mut loaded = 0;
        for item in self.kv.scan_prefix(RECORD_PREFIX.as_bytes()) {
            if loaded >= n {
                break;
            }
            let (raw_key, raw_value) = item?;
            let key = KvStore::parse_record_key(&raw_key)?;
            if self.records.read().contains_key(&key) {
                continue;
            }
            let record: Record = codec::decode(&raw_value)?;
            self.records.write().insert(key, record);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Ordered iteration over every record key in the KV store.
    pub fn scan_keys(&self) -> impl Iterator<Item = Result<Key>> + '_ {
        self.kv
            .scan_prefix(RECORD_PREFIX.as_bytes())
            .map(|item| item.and_then(|(raw_key, _)| KvStore::parse_record_key(&raw_key)))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Scalar;

    fn tmp_cache() -> (RecordCache, std::path::PathBuf) {
        let id = uuid::Uuid::new_v4();
        let path = std::env::temp_dir().join(format!("vexdb_cache_{id}"));
        let kv = Arc::new(KvStore::open(&path, true).unwrap());
        (RecordCache::new(kv), path)
    }

    fn cleanup(path: &std::path::Path) {
        let _ = std::fs::remove_dir_all(path);
    }

    fn record(key: Key) -> Record {
        Record::new(key).with_scalar(Scalar::Integer(key as i64))
    }

    #[test]
    fn test_put_get_hits_cache() {
        let (cache, path) = tmp_cache();
        cache.put(1, record(1)).unwrap();
        assert_eq!(cache.get(1).unwrap(), record(1));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
        cleanup(&path);
    }

    #[test]
    fn test_miss_fills_cache() {
        let (cache, path) = tmp_cache();
        cache.put(1, record(1)).unwrap();
        // A fresh cache over the same store must decode from disk once.
        drop(cache);
        let kv = Arc::new(KvStore::open(&path, false).unwrap());
        let cold = RecordCache::new(kv);
        assert_eq!(cold.get(1).unwrap(), record(1));
        assert_eq!(cold.stats().misses, 1);
        assert_eq!(cold.get(1).unwrap(), record(1));
        assert_eq!(cold.stats().hits, 1);
        cleanup(&path);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (cache, path) = tmp_cache();
        assert!(matches!(cache.get(99), Err(Error::NotFound(_))));
        cleanup(&path);
    }

    #[test]
    fn test_delete_is_write_through() {
        let (cache, path) = tmp_cache();
        cache.put(1, record(1)).unwrap();
        cache.delete(1).unwrap();
        assert!(!cache.contains(1).unwrap());
        assert!(matches!(cache.get(1), Err(Error::NotFound(_))));
        cleanup(&path);
    }

    #[test]
    fn test_flush_clears_dirty_but_keeps_entries() {
        let (cache, path) = tmp_cache();
        cache.put(1, record(1)).unwrap();
        cache.flush().unwrap();
        assert!(cache.dirty.lock().is_empty());
        assert_eq!(cache.get(1).unwrap(), record(1));
        assert_eq!(cache.stats().hits, 1);
        cleanup(&path);
    }

    #[test]
    fn test_prefetch_warms_up_to_n() {
        let (cache, path) = tmp_cache();
        for key in 0..5 {
            cache.put(key, record(key)).unwrap();
        }
        drop(cache);
        let kv = Arc::new(KvStore::open(&path, false).unwrap());
        let cold = RecordCache::new(kv);
        assert_eq!(cold.prefetch(3).unwrap(), 3);
        assert_eq!(cold.prefetch(100).unwrap(), 2);
        cleanup(&path);
    }

    #[test]
    fn test_scan_keys_sees_all_records() {
        let (cache, path) = tmp_cache();
        for key in [3u64, 1, 2] {
            cache.put(key, record(key)).unwrap();
        }
        let mut keys: Vec<Key> = cache.scan_keys().map(|k| k.unwrap()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![1, 2, 3]);
        cleanup(&path);
    }
}
