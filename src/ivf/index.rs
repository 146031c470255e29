//! IVF-Flat index: a coarse centroid table with unquantized posting lists.
//!
//! Every stored vector lives verbatim in the posting list of its nearest
//! centroid at insertion time. Replacing the centroid table afterwards does
//! not move existing postings; list positions reflect the centroids in
//! effect when each vector was put.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::ivf::distance::l2sq;
use crate::record::{Key, Vector};

/// One inverted list: the `(key, vector)` pairs assigned to a centroid.
pub type IvfList = Vec<(Key, Vector)>;

/// IVF-Flat index over a single vector field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvfFlatIndex {
    field_name: String,
    dim: usize,
    nlist: usize,
    centroids: Vec<Vector>,
    inverted_lists: Vec<IvfList>,
}

impl IvfFlatIndex {
    /// Creates an empty index. Centroids start at the origin, so `put`
    /// before [`set_centroids`](Self::set_centroids) assigns everything to
    /// list 0 via the lowest-index tie-break.
    pub fn new(field_name: impl Into<String>, dim: usize, nlist: usize) -> Self {
        Self {
            field_name: field_name.into(),
            dim,
            nlist,
            centroids: vec![vec![0.0; dim]; nlist],
            inverted_lists: vec![Vec::new(); nlist],
        }
    }

    /// Reassembles an index from persisted parts, validating shape.
    pub(crate) fn from_parts(
        field_name: String,
        dim: usize,
        nlist: usize,
        centroids: Vec<Vector>,
        inverted_lists: Vec<IvfList>,
    ) -> Result<Self> {
        if centroids.len() != nlist || inverted_lists.len() != nlist {
            return Err(Error::corruption(format!(
                "index '{field_name}' has {} centroids and {} lists, expected {nlist}",
                centroids.len(),
                inverted_lists.len()
            )));
        }
        for centroid in &centroids {
            if centroid.len() != dim {
                return Err(Error::corruption(format!(
                    "index '{field_name}' centroid dimension {} != {dim}",
                    centroid.len()
                )));
            }
        }
        Ok(Self {
            field_name,
            dim,
            nlist,
            centroids,
            inverted_lists,
        })
    }

    pub fn name(&self) -> &str {
        &self.field_name
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nlist(&self) -> usize {
        self.nlist
    }

    pub fn centroids(&self) -> &[Vector] {
        &self.centroids
    }

    pub fn inverted_lists(&self) -> &[IvfList] {
        &self.inverted_lists
    }

    /// Total number of postings across all lists.
    pub fn len(&self) -> usize {
        self.inverted_lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inverted_lists.iter().all(Vec::is_empty)
    }

    /// Replaces the centroid table.
    ///
    /// Existing postings are NOT rebucketed: they stay in the lists chosen
    /// by the centroids in effect when they were put. Callers that need
    /// reassignment must delete and re-put.
    pub fn set_centroids(&mut self, centroids: Vec<Vector>) -> Result<()> {
        if centroids.len() != self.nlist {
            return Err(Error::shape(format!(
                "field '{}' expects {} centroids, got {}",
                self.field_name,
                self.nlist,
                centroids.len()
            )));
        }
        for (idx, centroid) in centroids.iter().enumerate() {
            if centroid.len() != self.dim {
                return Err(Error::shape(format!(
                    "field '{}' centroid {idx} has dimension {}, expected {}",
                    self.field_name,
                    centroid.len(),
                    self.dim
                )));
            }
        }
        self.centroids = centroids;
        Ok(())
    }

    /// Appends `(key, v)` to the posting list of the nearest centroid.
    ///
    /// Keys are not deduplicated across lists; putting an existing key again
    /// leaves the old posting in place.
    pub fn put(&mut self, key: Key, v: Vector) -> Result<()> {
        if v.len() != self.dim {
            return Err(Error::shape(format!(
                "field '{}' expects dimension {}, got {}",
                self.field_name,
                self.dim,
                v.len()
            )));
        }
        if self.nlist == 0 {
            // Unindexed field: records are still stored, only full scans
            // can rank on it.
            return Ok(());
        }
        let list = self.assign(&v);
        self.inverted_lists[list].push((key, v));
        Ok(())
    }

    /// Removes every posting with the given key. Returns how many were
    /// removed.
    pub fn delete(&mut self, key: Key) -> usize {
        let mut removed = 0;
        for list in &mut self.inverted_lists {
            let before = list.len();
            list.retain(|(k, _)| *k != key);
            removed += before - list.len();
        }
        removed
    }

    /// Index of the nearest centroid under L2²; ties go to the lower index.
    pub fn assign(&self, v: &[f32]) -> usize {
        debug_assert!(self.nlist > 0);
        let mut best = 0usize;
        let mut best_dist = f32::MAX;
        for (idx, centroid) in self.centroids.iter().enumerate() {
            let dist = l2sq(v, centroid);
            if dist < best_dist {
                best_dist = dist;
                best = idx;
            }
        }
        best
    }

    /// The `nprobe` nearest centroid indices, ascending by distance to
    /// `query` with ties broken by lower index. Clamped to `nlist`.
    pub fn probe_order(&self, query: &[f32], nprobe: usize) -> Vec<usize> {
        let mut pairs: Vec<(f32, usize)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(idx, centroid)| (l2sq(query, centroid), idx))
            .collect();
        pairs.sort_unstable_by(|a, b| match a.0.partial_cmp(&b.0) {
            Some(Ordering::Equal) | None => a.1.cmp(&b.1),
            Some(ordering) => ordering,
        });
        pairs.truncate(nprobe.min(self.nlist));
        pairs.into_iter().map(|(_, idx)| idx).collect()
    }
}
