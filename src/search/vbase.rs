//! Adaptive-stepping search over per-element probe iterators.
//!
//! Each round advances every field's iterator by an adaptive number of
//! elements: until every field has scored at least one candidate (or when
//! `n2` is zero) all fields step by one; afterwards the `n2` extra steps
//! are shared out proportionally to each field's reciprocal mean aggregate
//! score, so fields currently contributing smaller distances are probed
//! deeper. Termination follows the same threshold rule as the other
//! strategies.

use std::collections::HashSet;

use crate::error::Result;
use crate::ivf::probe::ProbeIterator;
use crate::query::QueryResult;
use crate::search::filter::matches_filters;
use crate::search::handler::{aggregate_distance, FieldQuery, QueryHandler, SearchStats};
use crate::search::heap::TopKHeap;

/// Elements every field advances while score statistics are still warming
/// up.
const STEPS_PER_ROUND: usize = 1;

struct FieldState<'a> {
    field: FieldQuery<'a>,
    it: ProbeIterator<'a>,
    /// Smallest field-local L2² this iterator has emitted.
    floor: f32,
    /// Aggregate-distance statistics over this field's scored candidates.
    scores_sum: f64,
    scores_count: u64,
}

impl<'a> QueryHandler<'a> {
    /// Runs the adaptive-stepping strategy with probe width `nprobe` and
    /// `n2` shared extra steps per round.
    pub(crate) fn knn_search_vbase(&self, nprobe: usize, n2: usize) -> Result<Vec<QueryResult>> {
        let limit = self.limit();
        if limit == 0 {
            return Ok(Vec::new());
        }
        let fields = self.prepare_fields()?;
        let filters = self.resolved_filters()?;
        let stats = SearchStats::default();

        let mut states: Vec<FieldState<'a>> = fields
            .iter()
            .map(|&field| {
                let mut it = ProbeIterator::new(field.index, field.query_vec, nprobe);
                it.seek();
                FieldState {
                    field,
                    it,
                    floor: f32::MAX,
                    scores_sum: 0.0,
                    scores_count: 0,
                }
            })
            .collect();

        let mut heap = TopKHeap::new(limit);
        let mut visited = HashSet::new();

        loop {
            let steps = round_steps(&states, n2);
            let mut progressed = false;

            for (state, step) in states.iter_mut().zip(&steps) {
                for _ in 0..*step {
                    let Some(candidate) = state.it.next() else {
                        break;
                    };
                    progressed = true;
                    if !visited.insert(candidate.key) {
                        continue;
                    }
                    stats.record_scanned();
                    let record = self.records().get(candidate.key)?;
                    if !matches_filters(&record, &filters) {
                        stats.record_filtered_out();
                        continue;
                    }
                    let total = aggregate_distance(&record, &fields)?;
                    if candidate.distance < state.floor {
                        state.floor = candidate.distance;
                    }
                    state.scores_sum += f64::from(total);
                    state.scores_count += 1;
                    heap.insert(candidate.key, total);
                }
            }

            if heap.is_full() {
                let bound: f32 = states
                    .iter()
                    .map(|state| state.field.weight * state.floor)
                    .sum();
                if let Some(worst) = heap.worst() {
                    if bound >= worst {
                        break;
                    }
                }
            }
            if !progressed {
                break;
            }
        }

        let results = heap.into_sorted();
        self.log_stats("knn_search_vbase", &stats, results.len());
        Ok(results)
    }
}

/// Per-field step counts for one round.
///
/// With statistics available, field `f` steps `1 + ceil(n2 · r_f / Σ r_g)`
/// where `r_f` is the reciprocal of the field's mean aggregate score.
fn round_steps(states: &[FieldState<'_>], n2: usize) -> Vec<usize> {
    if n2 == 0 || states.iter().any(|s| s.scores_count == 0) {
        return vec![STEPS_PER_ROUND; states.len()];
    }
    let reciprocals: Vec<f64> = states
        .iter()
        .map(|s| s.scores_count as f64 / s.scores_sum)
        .collect();
    let denom: f64 = reciprocals.iter().sum();
    if !denom.is_finite() || denom <= 0.0 {
        return vec![STEPS_PER_ROUND; states.len()];
    }
    reciprocals
        .iter()
        .map(|r| 1 + (n2 as f64 * r / denom).ceil() as usize)
        .collect()
}
