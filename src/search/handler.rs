//! Query execution: validation, the default round-robin search strategy,
//! and the brute-force full scan.
//!
//! The round-robin strategy drives one cluster-mode probe iterator per
//! query vector field. Each round it takes the next probe cluster of every
//! live iterator and scores that cluster's postings in parallel; shared
//! state (the visited set, the bounded result heap, and each field's
//! smallest observed distance) sits behind its own mutex, and no lock is
//! held across record decoding or distance computation. After every round
//! the threshold rule compares the weighted sum of per-field floors against
//! the current k-th best aggregate distance to decide termination.

use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::ivf::distance::l2sq;
use crate::ivf::index::IvfFlatIndex;
use crate::ivf::probe::ProbeIterator;
use crate::query::{Query, QueryResult};
use crate::record::Record;
use crate::schema::Schema;
use crate::search::filter::{matches_filters, resolve_filters, ResolvedFilter};
use crate::search::heap::TopKHeap;
use crate::storage::cache::RecordCache;

/// Counters accumulated while a single query runs.
#[derive(Debug, Default)]
pub(crate) struct SearchStats {
    records_scanned: AtomicU64,
    records_filtered_out: AtomicU64,
}

impl SearchStats {
    pub(crate) fn record_scanned(&self) {
        self.records_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_filtered_out(&self) {
        self.records_filtered_out.fetch_add(1, Ordering::Relaxed);
    }
}

/// A query vector target validated against the schema, bound to its record
/// slot and index.
#[derive(Clone, Copy)]
pub(crate) struct FieldQuery<'a> {
    pub(crate) name: &'a str,
    pub(crate) vector_idx: usize,
    pub(crate) query_vec: &'a [f32],
    pub(crate) weight: f32,
    pub(crate) index: &'a IvfFlatIndex,
}

/// Per-field cursor state for the round-robin strategy.
struct FieldCursor<'a> {
    field: FieldQuery<'a>,
    it: ProbeIterator<'a>,
    /// Smallest field-local L2² emitted by this cursor's stream so far.
    floor: Mutex<f32>,
}

/// Executes one query against a read-only snapshot of the engine state.
pub(crate) struct QueryHandler<'a> {
    schema: &'a Schema,
    indexes: &'a HashMap<String, IvfFlatIndex>,
    records: &'a RecordCache,
    query: &'a Query,
}

impl<'a> QueryHandler<'a> {
    pub(crate) fn new(
        schema: &'a Schema,
        indexes: &'a HashMap<String, IvfFlatIndex>,
        records: &'a RecordCache,
        query: &'a Query,
    ) -> Self {
        Self {
            schema,
            indexes,
            records,
            query,
        }
    }

    /// Validates every vector target: known field, matching dimension,
    /// non-negative weight.
    pub(crate) fn prepare_fields(&self) -> Result<Vec<FieldQuery<'a>>> {
        self.query
            .vectors()
            .iter()
            .map(|target| {
                let vector_idx = self.schema.vector_field_idx(&target.field)?;
                let declared = &self.schema.vector_fields()[vector_idx];
                if target.vector.len() != declared.dim {
                    return Err(Error::shape(format!(
                        "query vector for field '{}' has dimension {}, expected {}",
                        target.field,
                        target.vector.len(),
                        declared.dim
                    )));
                }
                if target.weight < 0.0 {
                    return Err(Error::usage(format!(
                        "negative weight for field '{}'",
                        target.field
                    )));
                }
                let index = self.indexes.get(&target.field).ok_or_else(|| {
                    Error::schema(format!("no index for vector field '{}'", target.field))
                })?;
                Ok(FieldQuery {
                    name: &target.field,
                    vector_idx,
                    query_vec: &target.vector,
                    weight: target.weight,
                    index,
                })
            })
            .collect()
    }

    pub(crate) fn resolved_filters(&self) -> Result<Vec<ResolvedFilter<'a>>> {
        resolve_filters(self.schema, self.query.filters())
    }

    pub(crate) fn records(&self) -> &'a RecordCache {
        self.records
    }

    pub(crate) fn limit(&self) -> usize {
        self.query.limit()
    }

    /// Default multi-vector KNN: round-robin over per-field probe clusters
    /// with parallel candidate scoring and threshold-rule termination.
    pub(crate) fn knn_search(&self, nprobe: usize) -> Result<Vec<QueryResult>> {
        let k = self.query.limit();
        if k == 0 {
            return Ok(Vec::new());
        }
        let fields = self.prepare_fields()?;
        let filters = self.resolved_filters()?;
        let stats = SearchStats::default();

        let mut cursors: Vec<FieldCursor<'a>> = fields
            .iter()
            .map(|&field| {
                let mut it = ProbeIterator::new(field.index, field.query_vec, nprobe);
                it.seek_clusters();
                FieldCursor {
                    field,
                    it,
                    floor: Mutex::new(f32::MAX),
                }
            })
            .collect();

        let heap = Mutex::new(TopKHeap::new(k));
        let visited = Mutex::new(HashSet::new());

        loop {
            let mut exhausted = true;
            for cursor in &mut cursors {
                let Some(cluster) = cursor.it.cluster() else {
                    continue;
                };
                exhausted = false;

                cluster.par_iter().try_for_each(|(key, posting_vec)| -> Result<()> {
                    {
                        let mut seen = visited.lock();
                        if !seen.insert(*key) {
                            return Ok(());
                        }
                    }
                    stats.record_scanned();
                    let record = self.records.get(*key)?;
                    if !matches_filters(&record, &filters) {
                        stats.record_filtered_out();
                        return Ok(());
                    }
                    let total = aggregate_distance(&record, &fields)?;
                    let field_distance = l2sq(cursor.field.query_vec, posting_vec);
                    {
                        let mut floor = cursor.floor.lock();
                        if field_distance < *floor {
                            *floor = field_distance;
                        }
                    }
                    heap.lock().insert(*key, total);
                    Ok(())
                })?;

                cursor.it.advance_cluster();
            }

            {
                let heap = heap.lock();
                if heap.is_full() {
                    let bound: f32 = cursors
                        .iter()
                        .map(|cursor| cursor.field.weight * *cursor.floor.lock())
                        .sum();
                    if let Some(worst) = heap.worst() {
                        if bound >= worst {
                            break;
                        }
                    }
                }
            }
            if exhausted {
                break;
            }
        }

        let results = heap.into_inner().into_sorted();
        self.log_stats("knn_search", &stats, results.len());
        Ok(results)
    }

    /// Ground-truth scan: every record under the `r:` prefix, filtered and
    /// ranked by aggregate distance.
    pub(crate) fn full_scan(&self) -> Result<Vec<QueryResult>> {
        let k = self.query.limit();
        if k == 0 {
            return Ok(Vec::new());
        }
        let fields = self.prepare_fields()?;
        let filters = self.resolved_filters()?;
        let stats = SearchStats::default();

        let mut heap = TopKHeap::new(k);
        for key in self.records.scan_keys() {
            let key = key?;
            stats.record_scanned();
            let record = self.records.get(key)?;
            if !matches_filters(&record, &filters) {
                stats.record_filtered_out();
                continue;
            }
            let total = aggregate_distance(&record, &fields)?;
            heap.insert(key, total);
        }

        let results = heap.into_sorted();
        self.log_stats("full_scan", &stats, results.len());
        Ok(results)
    }

    pub(crate) fn log_stats(&self, strategy: &str, stats: &SearchStats, results: usize) {
        tracing::debug!(
            strategy,
            records_scanned = stats.records_scanned.load(Ordering::Relaxed),
            records_filtered_out = stats.records_filtered_out.load(Ordering::Relaxed),
            results,
            "query finished"
        );
    }
}

/// Weighted sum of per-field L2² distances between the query targets and
/// the record's vectors.
pub(crate) fn aggregate_distance(record: &Record, fields: &[FieldQuery<'_>]) -> Result<f32> {
    let mut total = 0.0f32;
    for field in fields {
        let vector = record.vectors.get(field.vector_idx).ok_or_else(|| {
            Error::shape(format!(
                "record {} has no vector for field '{}'",
                record.id, field.name
            ))
        })?;
        if vector.len() != field.query_vec.len() {
            return Err(Error::shape(format!(
                "record {} vector for field '{}' has dimension {}, expected {}",
                record.id,
                field.name,
                vector.len(),
                field.query_vec.len()
            )));
        }
        total += field.weight * l2sq(field.query_vec, vector);
    }
    Ok(total)
}
