//! Scalar filter resolution and evaluation.
//!
//! Filters are resolved against the schema once per query — unknown fields
//! and type mismatches fail before any distance work — so the per-record
//! check in the hot path is infallible. Conditions are AND-composed. Floats
//! compare under `f64::total_cmp`, strings lexicographically.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::query::{FilterOp, ScalarFilter};
use crate::record::{Record, Scalar};
use crate::schema::Schema;

/// A filter bound to its scalar slot after schema validation.
#[derive(Debug, Clone)]
pub struct ResolvedFilter<'a> {
    scalar_idx: usize,
    op: FilterOp,
    value: &'a Scalar,
}

/// Resolves query filters against the schema.
///
/// Unknown field names are a `Schema` error; a filter value whose type
/// differs from the field's declared type is a `Usage` error (mixed-type
/// comparison is a malformed query).
pub fn resolve_filters<'a>(
    schema: &Schema,
    filters: &'a [ScalarFilter],
) -> Result<Vec<ResolvedFilter<'a>>> {
    filters
        .iter()
        .map(|filter| {
            let scalar_idx = schema.scalar_field_idx(&filter.field)?;
            let field = &schema.scalar_fields()[scalar_idx];
            if !field.scalar_type.matches(&filter.value) {
                return Err(Error::usage(format!(
                    "filter value for field '{}' does not match its declared type",
                    filter.field
                )));
            }
            Ok(ResolvedFilter {
                scalar_idx,
                op: filter.op,
                value: &filter.value,
            })
        })
        .collect()
}

/// Whether a record satisfies every resolved filter.
pub fn matches_filters(record: &Record, filters: &[ResolvedFilter<'_>]) -> bool {
    filters.iter().all(|filter| filter.matches(record))
}

impl ResolvedFilter<'_> {
    fn matches(&self, record: &Record) -> bool {
        let Some(scalar) = record.scalars.get(self.scalar_idx) else {
            return false;
        };
        let Some(ordering) = compare(scalar, self.value) else {
            return false;
        };
        match self.op {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ne => ordering != Ordering::Equal,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Ge => ordering != Ordering::Less,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Le => ordering != Ordering::Greater,
        }
    }
}

fn compare(a: &Scalar, b: &Scalar) -> Option<Ordering> {
    match (a, b) {
        (Scalar::Integer(x), Scalar::Integer(y)) => Some(x.cmp(y)),
        (Scalar::Float(x), Scalar::Float(y)) => Some(x.total_cmp(y)),
        (Scalar::String(x), Scalar::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarType;

    fn test_schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .add_scalar_field("age", ScalarType::Integer)
            .unwrap()
            .add_scalar_field("name", ScalarType::String)
            .unwrap();
        schema
    }

    fn record(age: i64, name: &str) -> Record {
        Record::new(0)
            .with_scalar(Scalar::Integer(age))
            .with_scalar(Scalar::String(name.into()))
    }

    #[test]
    fn test_operators() {
        let schema = test_schema();
        let raw = [
            ScalarFilter {
                field: "age".into(),
                op: FilterOp::Ge,
                value: Scalar::Integer(18),
            },
            ScalarFilter {
                field: "name".into(),
                op: FilterOp::Ne,
                value: Scalar::String("Bob".into()),
            },
        ];
        let filters = resolve_filters(&schema, &raw).unwrap();
        assert!(matches_filters(&record(20, "Alice"), &filters));
        assert!(!matches_filters(&record(17, "Alice"), &filters));
        assert!(!matches_filters(&record(20, "Bob"), &filters));
    }

    #[test]
    fn test_unknown_field_is_schema_error() {
        let schema = test_schema();
        let raw = [ScalarFilter {
            field: "missing".into(),
            op: FilterOp::Eq,
            value: Scalar::Integer(1),
        }];
        assert!(matches!(
            resolve_filters(&schema, &raw),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_type_mismatch_is_usage_error() {
        let schema = test_schema();
        let raw = [ScalarFilter {
            field: "age".into(),
            op: FilterOp::Eq,
            value: Scalar::String("18".into()),
        }];
        assert!(matches!(
            resolve_filters(&schema, &raw),
            Err(Error::Usage(_))
        ));
    }

    #[test]
    fn test_string_ordering_lexicographic() {
        let schema = test_schema();
        let raw = [ScalarFilter {
            field: "name".into(),
            op: FilterOp::Lt,
            value: Scalar::String("b".into()),
        }];
        let filters = resolve_filters(&schema, &raw).unwrap();
        assert!(matches_filters(&record(0, "alice"), &filters));
        assert!(!matches_filters(&record(0, "bob"), &filters));
    }

    #[test]
    fn test_empty_filters_accept_everything() {
        let filters = resolve_filters(&test_schema(), &[]).unwrap();
        assert!(matches_filters(&record(0, ""), &filters));
    }
}
