//! Storage layer: the RocksDB key/value wrapper, the blob codec, and the
//! decoded-record cache.
//!
//! Records, the schema, and index partitions all persist as framed bincode
//! blobs under reserved key prefixes; queries read decoded records through
//! the write-back cache so hot data is never re-decoded.

/// Write-back record cache with hit/miss counters.
pub mod cache;
/// Bincode + CRC32 framing and index partitioning.
pub mod codec;
/// RocksDB wrapper and key scheme.
pub mod kv;

pub use cache::{CacheStats, RecordCache};
pub use kv::KvStore;
