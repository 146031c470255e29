//! Iterative-merge search: per-field top-k recomputed from scratch each
//! round with a doubling k.
//!
//! Each round unions the k nearest keys of every field (minus everything
//! already visited), fetches and scores the union, and stops once the
//! weighted sum of this round's per-field floors reaches the current k-th
//! best aggregate — or once k reaches the caller's ceiling.

use std::collections::HashSet;

use crate::error::Result;
use crate::ivf::distance::l2sq;
use crate::ivf::probe::ProbeIterator;
use crate::query::QueryResult;
use crate::record::Key;
use crate::search::filter::matches_filters;
use crate::search::handler::{aggregate_distance, FieldQuery, QueryHandler, SearchStats};
use crate::search::heap::TopKHeap;

impl<'a> QueryHandler<'a> {
    /// Runs the iterative-merge strategy with probe width `nprobe`,
    /// doubling the per-field k until it reaches `k_threshold`. At least
    /// one round always runs.
    pub(crate) fn knn_search_iterative_merge(
        &self,
        nprobe: usize,
        k_threshold: usize,
    ) -> Result<Vec<QueryResult>> {
        let limit = self.limit();
        if limit == 0 {
            return Ok(Vec::new());
        }
        let fields = self.prepare_fields()?;
        let filters = self.resolved_filters()?;
        let stats = SearchStats::default();

        let mut heap = TopKHeap::new(limit);
        let mut visited: HashSet<Key> = HashSet::new();
        let mut k = limit;

        loop {
            // Union of fresh per-field top-k results, minus visited keys.
            let mut pass_set: HashSet<Key> = HashSet::new();
            let mut candidates: Vec<Key> = Vec::new();
            for field in &fields {
                for key in top_k_keys(field, k, nprobe) {
                    if !visited.contains(&key) && pass_set.insert(key) {
                        candidates.push(key);
                    }
                }
            }

            // This pass's field-local floors; f32::MAX when a pass sees
            // nothing for a field.
            let mut floors = vec![f32::MAX; fields.len()];
            for key in candidates {
                visited.insert(key);
                stats.record_scanned();
                let record = self.records().get(key)?;
                for (slot, field) in fields.iter().enumerate() {
                    if let Some(vector) = record.vectors.get(field.vector_idx) {
                        if vector.len() == field.query_vec.len() {
                            let distance = l2sq(field.query_vec, vector);
                            if distance < floors[slot] {
                                floors[slot] = distance;
                            }
                        }
                    }
                }
                if !matches_filters(&record, &filters) {
                    stats.record_filtered_out();
                    continue;
                }
                let total = aggregate_distance(&record, &fields)?;
                heap.insert(key, total);
            }

            if heap.is_full() {
                let bound: f32 = fields
                    .iter()
                    .zip(&floors)
                    .map(|(field, floor)| field.weight * floor)
                    .sum();
                if let Some(worst) = heap.worst() {
                    if bound >= worst {
                        break;
                    }
                }
            }

            k = k.saturating_mul(2);
            if k >= k_threshold {
                break;
            }
        }

        let results = heap.into_sorted();
        self.log_stats("knn_search_iterative_merge", &stats, results.len());
        Ok(results)
    }
}

/// The k nearest keys of one field under L2², via a per-element probe
/// traversal into a bounded heap.
fn top_k_keys(field: &FieldQuery<'_>, k: usize, nprobe: usize) -> Vec<Key> {
    let mut it = ProbeIterator::new(field.index, field.query_vec, nprobe);
    it.seek();
    let mut heap = TopKHeap::new(k);
    for candidate in it {
        heap.insert(candidate.key, candidate.distance);
    }
    heap.into_sorted().into_iter().map(|r| r.key).collect()
}
