//! RocksDB-backed key/value layer.
//!
//! Key space layout (byte keys, ordered):
//! - `s:` — the schema blob (single key);
//! - `r:<decimal key>` — one record blob per record (prefix scans only;
//!   decimal keys do not sort numerically);
//! - `i:<field>:<partition>` — one blob per index partition;
//! - `c:<field>` — reserved for externally trained centroid lists.

use rocksdb::{Direction, IteratorMode, Options, DB};
use std::path::Path;

use crate::error::{Error, Result};
use crate::record::Key;

/// Key under which the schema blob is stored.
pub const SCHEMA_KEY: &str = "s:";
/// Prefix for record blobs.
pub const RECORD_PREFIX: &str = "r:";
/// Prefix for index partition blobs.
pub const INDEX_PREFIX: &str = "i:";
/// Reserved prefix for centroid lists; unused by the engine itself.
pub const CENTROID_PREFIX: &str = "c:";

/// Thin wrapper around a RocksDB handle with the engine's key scheme.
pub struct KvStore {
    db: DB,
}

impl KvStore {
    /// Opens (or creates, per `create_if_missing`) the store at `path`.
    pub fn open(path: &Path, create_if_missing: bool) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(create_if_missing);
        let db = DB::open(&options, path)?;
        Ok(Self { db })
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.put(key, value)?;
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?)
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.delete(key)?;
        Ok(())
    }

    /// Ordered scan over every key starting with `prefix`.
    pub fn scan_prefix<'s>(
        &'s self,
        prefix: &[u8],
    ) -> impl Iterator<Item = Result<(Box<[u8]>, Box<[u8]>)>> + 's {
        let owned = prefix.to_vec();
        self.db
            .iterator(IteratorMode::From(prefix, Direction::Forward))
            .map(|item| item.map_err(Error::from))
            .take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&owned),
                Err(_) => true,
            })
    }

    /// `r:<decimal key>`
    pub fn record_key(key: Key) -> Vec<u8> {
        format!("{RECORD_PREFIX}{key}").into_bytes()
    }

    /// `i:<field>:<partition>`
    pub fn index_partition_key(field: &str, partition: usize) -> Vec<u8> {
        format!("{INDEX_PREFIX}{field}:{partition}").into_bytes()
    }

    /// `i:<field>:` — the prefix shared by all of a field's partitions.
    pub fn index_prefix(field: &str) -> Vec<u8> {
        format!("{INDEX_PREFIX}{field}:").into_bytes()
    }

    /// Parses the record key back out of a raw `r:<decimal>` byte key.
    pub fn parse_record_key(raw: &[u8]) -> Result<Key> {
        let decimal = raw
            .strip_prefix(RECORD_PREFIX.as_bytes())
            .ok_or_else(|| Error::corruption("record key missing 'r:' prefix"))?;
        std::str::from_utf8(decimal)
            .ok()
            .and_then(|s| s.parse::<Key>().ok())
            .ok_or_else(|| {
                Error::corruption(format!(
                    "record key is not a decimal integer: {:?}",
                    String::from_utf8_lossy(raw)
                ))
            })
    }

    /// Parses the partition number out of a raw `i:<field>:<n>` byte key.
    pub fn parse_partition_number(raw: &[u8], field: &str) -> Result<usize> {
        let suffix = raw
            .strip_prefix(Self::index_prefix(field).as_slice())
            .ok_or_else(|| Error::corruption("index key missing field prefix"))?;
        std::str::from_utf8(suffix)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| {
                Error::corruption(format!(
                    "index partition number is not an integer: {:?}",
                    String::from_utf8_lossy(raw)
                ))
            })
    }
}
