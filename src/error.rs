//! Error types for vexdb.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid open options, e.g. requesting creation without a schema.
    #[error("Config error: {0}")]
    Config(String),

    /// Unknown or duplicate field names, or values that violate a field's
    /// declared type.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A record, schema, or index blob that should exist does not.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A vector or centroid list whose dimensions do not match the schema.
    #[error("Shape error: {0}")]
    Shape(String),

    /// Underlying key/value store failure, surfaced verbatim.
    #[error("Storage backend error: {0}")]
    Backend(#[from] rocksdb::Error),

    /// Record/index blob (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// A stored blob failed its integrity check.
    #[error("Corrupted blob: {0}")]
    Corruption(String),

    /// A well-formed call that the engine cannot honour, e.g. a filter value
    /// whose type differs from the field's declared type.
    #[error("Usage error: {0}")]
    Usage(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        Error::Shape(msg.into())
    }

    pub fn corruption(msg: impl Into<String>) -> Self {
        Error::Corruption(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Error::Usage(msg.into())
    }
}
