//! IVF-Flat indexing: distance kernels, the index structure, and probe
//! iterators.

/// Distance kernels: scalar plus SIMD-dispatched L2².
pub mod distance;
/// Centroid table + inverted posting lists.
pub mod index;
/// Lazy cursor over the nearest probe clusters.
pub mod probe;

pub use distance::{l1, l2sq};
pub use index::{IvfFlatIndex, IvfList};
pub use probe::{ProbeCandidate, ProbeIterator};
