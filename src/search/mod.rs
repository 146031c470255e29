//! Query execution: filter evaluation, the bounded result heap, and the
//! top-k search strategies.
//!
//! Three strategies share the same bounded max-heap, visited-key set, and
//! threshold-rule termination: the default round-robin cluster walk with
//! parallel scoring, the doubling-k iterative merge, and adaptive
//! per-field stepping.

/// Scalar filter resolution and per-record evaluation.
pub mod filter;
/// Round-robin strategy, full scan, and shared query plumbing.
pub(crate) mod handler;
/// Bounded top-k max-heap.
pub mod heap;
/// Iterative-merge strategy with doubling per-field k.
pub(crate) mod merge;
/// Adaptive-stepping strategy.
pub(crate) mod vbase;

pub use filter::{matches_filters, resolve_filters, ResolvedFilter};
pub use heap::TopKHeap;
