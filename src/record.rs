//! Core record types.
//!
//! A `Record` is the unit of storage: a caller-chosen `u64` key, an ordered
//! list of typed scalars, and an ordered list of f32 vectors. Positions
//! correspond to the schema's scalar and vector field orderings.
//! Uses the default externally-tagged serde representation for bincode
//! compatibility.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Record key, unique per record, chosen by the caller.
pub type Key = u64;

/// Dense vector of 32-bit floats.
pub type Vector = Vec<f32>;

/// A typed scalar attribute attached to a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Scalar {
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// UTF-8 string.
    String(String),
}

impl Scalar {
    /// Parse a string back into a scalar.
    ///
    /// Coercion order: all-digit strings become `Integer`, strings that parse
    /// as `f64` become `Float`, everything else stays a `String`. The empty
    /// string is a `String`.
    pub fn parse(s: &str) -> Scalar {
        if s.is_empty() {
            return Scalar::String(String::new());
        }
        if s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(i) = s.parse::<i64>() {
                return Scalar::Integer(i);
            }
        }
        match s.parse::<f64>() {
            Ok(f) => Scalar::Float(f),
            Err(_) => Scalar::String(s.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// A stored record: key plus schema-ordered scalars and vectors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: Key,
    pub scalars: Vec<Scalar>,
    pub vectors: Vec<Vector>,
}

impl Record {
    /// Creates an empty record with the given key.
    pub fn new(id: Key) -> Self {
        Self {
            id,
            scalars: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Appends a scalar, in schema field order.
    pub fn with_scalar(mut self, scalar: Scalar) -> Self {
        self.scalars.push(scalar);
        self
    }

    /// Appends a vector, in schema field order.
    pub fn with_vector(mut self, vector: Vector) -> Self {
        self.vectors.push(vector);
        self
    }
}
