//! Global tuning constants for vexdb.
//!
//! These are compile-time constants; per-database settings live in
//! [`DbOptions`](crate::DbOptions).

/// Reference dimension used to normalise index partition sizing.
///
/// A centroid of dimension `d` counts as `d / 128` of a "base" centroid, so
/// long vectors produce more, smaller partitions.
pub const PARTITION_BASE_DIM: usize = 128;

/// Normalised centroid budget per persisted index partition.
pub const PARTITION_CENTROID_BUDGET: usize = 1_000;

/// Records prefetched into the cache when opening an existing database.
pub const PREFETCH_ON_OPEN: usize = 1_000;

/// Maximum supported vector dimension.
pub const MAX_DIMENSION: usize = 4_096;
