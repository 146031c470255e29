//! # vexdb
//!
//! An embedded hybrid vector + scalar database. Records pair fixed-dimension
//! f32 vectors with typed scalar attributes, persist through RocksDB, and
//! are served by per-field IVF-Flat indexes with multi-vector top-k search.
//!
//! ## Features
//!
//! - **IVF-Flat indexing** per vector field: coarse centroids with
//!   unquantized posting lists and lazy probe iterators
//! - **Multi-vector queries** ranked by a weighted sum of squared-Euclidean
//!   distances, with conjunctive scalar filters
//! - **Three top-k strategies** sharing a threshold-rule stop: round-robin
//!   cluster probing with parallel scoring, doubling-k iterative merge, and
//!   adaptive per-field stepping
//! - **Write-back record cache** above the key/value store, so query paths
//!   never re-decode hot records
//! - **Durable layout** of framed bincode blobs (schema, records, index
//!   partitions) under reserved RocksDB key prefixes
//!
//! ## Architecture
//!
//! ```text
//! Db → QueryHandler → { ProbeIterator per field } → TopKHeap
//!                   → RecordCache → KvStore (RocksDB)
//! Persistence: bincode + CRC32 blobs, indexes split across partitions
//! ```

/// Global configuration constants: partition sizing and cache defaults.
pub mod config;
/// Error enum and crate-wide `Result` alias.
pub mod error;
/// IVF-Flat indexing: distance kernels, index structure, probe iterators.
pub mod ivf;
/// Query description: vector targets, scalar filters, result limit.
pub mod query;
/// Core record types: `Record`, `Scalar`, `Key`, `Vector`.
pub mod record;
/// Schema: named vector and scalar field declarations.
pub mod schema;
/// Query execution: filters, bounded heap, search strategies.
pub mod search;
/// Storage layer: RocksDB wrapper, blob codec, record cache.
pub mod storage;

mod db;

pub use db::{Db, DbOptions};
pub use error::{Error, Result};
pub use query::{FilterOp, Query, QueryResult, ScalarFilter};
pub use record::{Key, Record, Scalar, Vector};
pub use schema::{ScalarType, Schema};
