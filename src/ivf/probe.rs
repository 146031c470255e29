//! Probe iterator: a lazy cursor over the `nprobe` nearest clusters of an
//! IVF-Flat index.
//!
//! Two modes share one probe order. Element mode ([`seek`](ProbeIterator::seek)
//! plus the `Iterator` impl) yields candidates ascending by distance within
//! each cluster via a per-cluster min-heap; distances are non-decreasing
//! inside a cluster but may drop at cluster boundaries. Cluster mode
//! ([`seek_clusters`](ProbeIterator::seek_clusters)) exposes whole posting
//! lists for callers that score entries themselves.

use ordered_float::OrderedFloat;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::ivf::distance::l2sq;
use crate::ivf::index::IvfFlatIndex;
use crate::record::{Key, Vector};

/// A candidate emitted by element mode: the posting's key and vector plus
/// its L2² distance to the query.
#[derive(Debug, Clone, Copy)]
pub struct ProbeCandidate<'a> {
    pub key: Key,
    pub vector: &'a [f32],
    pub distance: f32,
}

#[derive(Debug, Clone)]
struct HeapCandidate<'a> {
    distance: OrderedFloat<f32>,
    key: Key,
    vector: &'a [f32],
}

impl PartialEq for HeapCandidate<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance && self.key == other.key
    }
}

impl Eq for HeapCandidate<'_> {}

impl Ord for HeapCandidate<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.key.cmp(&other.key))
    }
}

impl PartialOrd for HeapCandidate<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Cursor over the nearest `nprobe` clusters of one index for one query.
///
/// Unseeded iterators yield nothing; call `seek` or `seek_clusters` first.
pub struct ProbeIterator<'a> {
    index: &'a IvfFlatIndex,
    query: &'a [f32],
    nprobe: usize,
    probe_lists: Vec<usize>,
    current: usize,
    candidates: BinaryHeap<Reverse<HeapCandidate<'a>>>,
}

impl<'a> ProbeIterator<'a> {
    pub fn new(index: &'a IvfFlatIndex, query: &'a [f32], nprobe: usize) -> Self {
        Self {
            index,
            query,
            nprobe,
            probe_lists: Vec::new(),
            current: 0,
            candidates: BinaryHeap::new(),
        }
    }

    /// Seeds element mode: selects the probe order and loads candidates from
    /// the first non-empty probe cluster.
    pub fn seek(&mut self) {
        self.probe_lists = self.index.probe_order(self.query, self.nprobe);
        self.current = 0;
        self.candidates.clear();
        self.collect_candidates();
        while self.candidates.is_empty() && self.current + 1 < self.probe_lists.len() {
            self.current += 1;
            self.collect_candidates();
        }
    }

    /// Seeds cluster mode: selects the probe order without materialising
    /// per-element candidates.
    pub fn seek_clusters(&mut self) {
        self.probe_lists = self.index.probe_order(self.query, self.nprobe);
        self.current = 0;
        self.candidates.clear();
    }

    /// Whether a probe cluster remains in cluster mode.
    pub fn has_cluster(&self) -> bool {
        self.current < self.probe_lists.len()
    }

    /// The current probe cluster's posting list, while one remains.
    pub fn cluster(&self) -> Option<&'a [(Key, Vector)]> {
        self.probe_lists
            .get(self.current)
            .map(|&list| self.index.inverted_lists()[list].as_slice())
    }

    /// Advances cluster mode to the next probe cluster.
    pub fn advance_cluster(&mut self) {
        self.current += 1;
    }

    fn collect_candidates(&mut self) {
        let Some(&list) = self.probe_lists.get(self.current) else {
            return;
        };
        for (key, vector) in &self.index.inverted_lists()[list] {
            self.candidates.push(Reverse(HeapCandidate {
                distance: OrderedFloat(l2sq(self.query, vector)),
                key: *key,
                vector,
            }));
        }
    }
}

impl<'a> Iterator for ProbeIterator<'a> {
    type Item = ProbeCandidate<'a>;

    /// Pops the nearest remaining candidate of the current cluster, then
    /// advances into following clusters once the cluster drains. Empty
    /// posting lists are skipped without emitting.
    fn next(&mut self) -> Option<Self::Item> {
        let Reverse(head) = self.candidates.pop()?;
        while self.candidates.is_empty() {
            self.current += 1;
            if self.current >= self.probe_lists.len() {
                break;
            }
            self.collect_candidates();
        }
        Some(ProbeCandidate {
            key: head.key,
            vector: head.vector,
            distance: head.distance.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_index() -> IvfFlatIndex {
        let mut index = IvfFlatIndex::new("vec", 1, 3);
        index
            .set_centroids(vec![vec![0.0], vec![10.0], vec![20.0]])
            .unwrap();
        index.put(0, vec![0.5]).unwrap();
        index.put(1, vec![0.1]).unwrap();
        index.put(2, vec![10.2]).unwrap();
        index.put(3, vec![19.9]).unwrap();
        index
    }

    #[test]
    fn test_element_mode_orders_within_cluster() {
        let index = populated_index();
        let query = vec![0.0];
        let mut it = ProbeIterator::new(&index, &query, 2);
        it.seek();
        let keys: Vec<Key> = it.map(|c| c.key).collect();
        // Cluster near 0.0 ascending (1 then 0), then cluster near 10.0.
        assert_eq!(keys, vec![1, 0, 2]);
    }

    #[test]
    fn test_unseeded_iterator_yields_nothing() {
        let index = populated_index();
        let query = vec![0.0];
        let mut it = ProbeIterator::new(&index, &query, 2);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_empty_clusters_are_skipped() {
        let mut index = IvfFlatIndex::new("vec", 1, 3);
        index
            .set_centroids(vec![vec![0.0], vec![10.0], vec![20.0]])
            .unwrap();
        // Only the farthest cluster holds a posting.
        index.put(9, vec![20.1]).unwrap();
        let query = vec![0.0];
        let mut it = ProbeIterator::new(&index, &query, 3);
        it.seek();
        let keys: Vec<Key> = it.by_ref().map(|c| c.key).collect();
        assert_eq!(keys, vec![9]);
    }

    #[test]
    fn test_nprobe_zero_probes_nothing() {
        let index = populated_index();
        let query = vec![0.0];
        let mut it = ProbeIterator::new(&index, &query, 0);
        it.seek();
        assert!(it.next().is_none());
    }

    #[test]
    fn test_cluster_mode_walks_probe_order() {
        let index = populated_index();
        let query = vec![10.0];
        let mut it = ProbeIterator::new(&index, &query, 2);
        it.seek_clusters();
        assert!(it.has_cluster());
        // Nearest cluster first: the one around 10.0.
        let first = it.cluster().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0, 2);
        it.advance_cluster();
        assert!(it.has_cluster());
        it.advance_cluster();
        assert!(!it.has_cluster());
        assert!(it.cluster().is_none());
    }

    #[test]
    fn test_distances_non_decreasing_within_cluster() {
        let mut index = IvfFlatIndex::new("vec", 1, 1);
        index.set_centroids(vec![vec![0.0]]).unwrap();
        for (key, x) in [(0u64, 3.0f32), (1, 1.0), (2, 2.0), (3, 0.5)] {
            index.put(key, vec![x]).unwrap();
        }
        let query = vec![0.0];
        let mut it = ProbeIterator::new(&index, &query, 1);
        it.seek();
        let dists: Vec<f32> = it.map(|c| c.distance).collect();
        for pair in dists.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
    }
}
