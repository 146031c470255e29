//! Database schema: named vector and scalar field declarations.
//!
//! The schema is fixed when a database is created and immutable afterwards.
//! Field positions in a [`Record`](crate::Record) follow the declaration
//! order; the name → index maps are rebuilt after deserialization rather
//! than persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::MAX_DIMENSION;
use crate::error::{Error, Result};
use crate::record::Scalar;

/// Declared type of a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    Integer,
    Float,
    String,
}

impl ScalarType {
    /// Whether a scalar value inhabits this type.
    pub fn matches(&self, value: &Scalar) -> bool {
        matches!(
            (self, value),
            (ScalarType::Integer, Scalar::Integer(_))
                | (ScalarType::Float, Scalar::Float(_))
                | (ScalarType::String, Scalar::String(_))
        )
    }
}

/// A named dense-vector field with a fixed dimension and centroid count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorField {
    pub name: String,
    /// Vector dimension; every stored vector and centroid must match it.
    pub dim: usize,
    /// Number of inverted lists in the field's index. Zero leaves the field
    /// unindexed (full scan only).
    pub nlist: usize,
}

/// A named scalar field with a declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarField {
    pub name: String,
    pub scalar_type: ScalarType,
}

/// Ordered field declarations plus name → index lookups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    vector_fields: Vec<VectorField>,
    scalar_fields: Vec<ScalarField>,
    #[serde(skip)]
    vector_field_idx: HashMap<String, usize>,
    #[serde(skip)]
    scalar_field_idx: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a vector field. Fails on duplicate names or an unsupported
    /// dimension.
    pub fn add_vector_field(
        &mut self,
        name: impl Into<String>,
        dim: usize,
        nlist: usize,
    ) -> Result<&mut Self> {
        let name = name.into();
        if dim == 0 || dim > MAX_DIMENSION {
            return Err(Error::shape(format!(
                "vector field '{name}' dimension {dim} out of range 1..={MAX_DIMENSION}"
            )));
        }
        if self.vector_field_idx.contains_key(&name) || self.scalar_field_idx.contains_key(&name) {
            return Err(Error::schema(format!("field '{name}' already exists")));
        }
        self.vector_field_idx
            .insert(name.clone(), self.vector_fields.len());
        self.vector_fields.push(VectorField { name, dim, nlist });
        Ok(self)
    }

    /// Declares a scalar field. Fails on duplicate names.
    pub fn add_scalar_field(
        &mut self,
        name: impl Into<String>,
        scalar_type: ScalarType,
    ) -> Result<&mut Self> {
        let name = name.into();
        if self.vector_field_idx.contains_key(&name) || self.scalar_field_idx.contains_key(&name) {
            return Err(Error::schema(format!("field '{name}' already exists")));
        }
        self.scalar_field_idx
            .insert(name.clone(), self.scalar_fields.len());
        self.scalar_fields.push(ScalarField { name, scalar_type });
        Ok(self)
    }

    pub fn vector_fields(&self) -> &[VectorField] {
        &self.vector_fields
    }

    pub fn scalar_fields(&self) -> &[ScalarField] {
        &self.scalar_fields
    }

    /// Position of a vector field in record order.
    pub fn vector_field_idx(&self, name: &str) -> Result<usize> {
        self.vector_field_idx
            .get(name)
            .copied()
            .ok_or_else(|| Error::schema(format!("vector field '{name}' not found")))
    }

    /// Position of a scalar field in record order.
    pub fn scalar_field_idx(&self, name: &str) -> Result<usize> {
        self.scalar_field_idx
            .get(name)
            .copied()
            .ok_or_else(|| Error::schema(format!("scalar field '{name}' not found")))
    }

    pub fn get_vector_field(&self, name: &str) -> Result<&VectorField> {
        self.vector_field_idx(name)
            .map(|idx| &self.vector_fields[idx])
    }

    pub fn get_scalar_field(&self, name: &str) -> Result<&ScalarField> {
        self.scalar_field_idx(name)
            .map(|idx| &self.scalar_fields[idx])
    }

    /// Rebuild the name → index maps after deserialization.
    pub(crate) fn rebuild_field_maps(&mut self) {
        self.vector_field_idx = self
            .vector_fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.clone(), idx))
            .collect();
        self.scalar_field_idx = self
            .scalar_fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.clone(), idx))
            .collect();
    }
}
