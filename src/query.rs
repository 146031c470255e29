//! Query description: weighted vector targets, scalar filters, and a result
//! limit.
//!
//! A query ranks records by the weighted sum of squared-Euclidean distances
//! between each named vector field and its target, restricted to records
//! passing every scalar filter (AND-composed).

use crate::record::{Key, Scalar, Vector};

/// Comparison operator for a scalar filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A single scalar predicate: `field <op> value`.
#[derive(Debug, Clone)]
pub struct ScalarFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Scalar,
}

/// One ranked vector target: field name, query vector, and weight.
#[derive(Debug, Clone)]
pub struct QueryVector {
    pub field: String,
    pub vector: Vector,
    pub weight: f32,
}

/// A top-k query over one or more vector fields.
#[derive(Debug, Clone, Default)]
pub struct Query {
    limit: usize,
    vectors: Vec<QueryVector>,
    filters: Vec<ScalarFilter>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vector target. Weights must be non-negative; this is checked
    /// when the query runs.
    pub fn add_vector(mut self, field: impl Into<String>, vector: Vector, weight: f32) -> Self {
        self.vectors.push(QueryVector {
            field: field.into(),
            vector,
            weight,
        });
        self
    }

    /// Adds a scalar filter. All filters must hold for a record to qualify.
    pub fn add_scalar_filter(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: Scalar,
    ) -> Self {
        self.filters.push(ScalarFilter {
            field: field.into(),
            op,
            value,
        });
        self
    }

    /// Sets the result limit `k`. A limit of zero yields an empty result.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn vectors(&self) -> &[QueryVector] {
        &self.vectors
    }

    pub fn filters(&self) -> &[ScalarFilter] {
        &self.filters
    }
}

/// A single search hit: record key and aggregate distance, ordered ascending
/// by distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryResult {
    pub key: Key,
    pub distance: f32,
}
