//! Database façade: open/close lifecycle, record CRUD, centroid
//! management, and the query entry points.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::PREFETCH_ON_OPEN;
use crate::error::{Error, Result};
use crate::ivf::index::IvfFlatIndex;
use crate::query::{Query, QueryResult};
use crate::record::{Key, Record, Vector};
use crate::schema::Schema;
use crate::search::handler::QueryHandler;
use crate::storage::cache::{CacheStats, RecordCache};
use crate::storage::codec::{self, IndexPartition};
use crate::storage::kv::{KvStore, SCHEMA_KEY};

/// Options controlling how a database is opened.
#[derive(Debug, Clone)]
pub struct DbOptions {
    /// Create the backing store if it does not exist. Only valid together
    /// with a schema.
    pub create_if_missing: bool,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            create_if_missing: true,
        }
    }
}

/// An embedded hybrid vector + scalar database.
///
/// Writes go through `&mut self`; queries run on `&self` against read-only
/// index and cache state. Dirty indexes and records persist on
/// [`close`](Db::close) (or best-effort on drop).
pub struct Db {
    path: PathBuf,
    schema: Schema,
    indexes: HashMap<String, IvfFlatIndex>,
    dirty_indexes: HashSet<String>,
    records: RecordCache,
    kv: Arc<KvStore>,
}

impl Db {
    /// Opens an existing database in read mode, loading the schema and
    /// every index from the store and prefetching records into the cache.
    ///
    /// `create_if_missing` is rejected here: creation requires a schema,
    /// see [`open_with_schema`](Db::open_with_schema).
    pub fn open(path: impl AsRef<Path>, options: DbOptions) -> Result<Db> {
        if options.create_if_missing {
            return Err(Error::config(
                "can only open an existing database without a schema",
            ));
        }
        let path = path.as_ref().to_path_buf();
        let kv = Arc::new(KvStore::open(&path, false)?);

        let raw_schema = kv
            .get(SCHEMA_KEY.as_bytes())?
            .ok_or_else(|| Error::not_found("schema"))?;
        let mut schema: Schema = codec::decode(&raw_schema)?;
        schema.rebuild_field_maps();

        let mut indexes = HashMap::new();
        for field in schema.vector_fields() {
            indexes.insert(field.name.clone(), load_index(&kv, &field.name)?);
        }

        let records = RecordCache::new(kv.clone());
        let prefetched = records.prefetch(PREFETCH_ON_OPEN)?;
        tracing::info!(
            path = %path.display(),
            vector_fields = schema.vector_fields().len(),
            prefetched,
            "opened database"
        );

        Ok(Db {
            path,
            schema,
            indexes,
            dirty_indexes: HashSet::new(),
            records,
            kv,
        })
    }

    /// Creates (or re-initialises) a database with the given schema,
    /// persisting the schema and one empty index per vector field.
    pub fn open_with_schema(
        path: impl AsRef<Path>,
        options: DbOptions,
        schema: Schema,
    ) -> Result<Db> {
        let path = path.as_ref().to_path_buf();
        let kv = Arc::new(KvStore::open(&path, options.create_if_missing)?);

        kv.put(SCHEMA_KEY.as_bytes(), &codec::encode(&schema)?)?;

        let mut indexes = HashMap::new();
        let mut dirty_indexes = HashSet::new();
        for field in schema.vector_fields() {
            indexes.insert(
                field.name.clone(),
                IvfFlatIndex::new(field.name.clone(), field.dim, field.nlist),
            );
            // Fresh indexes persist on close even if nothing is ever put.
            dirty_indexes.insert(field.name.clone());
        }

        let records = RecordCache::new(kv.clone());
        tracing::info!(
            path = %path.display(),
            vector_fields = schema.vector_fields().len(),
            scalar_fields = schema.scalar_fields().len(),
            "created database"
        );

        Ok(Db {
            path,
            schema,
            indexes,
            dirty_indexes,
            records,
            kv,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The centroid table currently in effect for a vector field.
    pub fn centroids(&self, field: &str) -> Result<&[Vector]> {
        self.index(field).map(|index| index.centroids())
    }

    /// Stores a record and appends its vectors to every field index.
    ///
    /// An existing record under the same key is overwritten in storage, but
    /// its old index postings are NOT removed — call
    /// [`delete_record`](Db::delete_record) first when a key's vectors need
    /// reassignment.
    pub fn put_record(&mut self, key: Key, record: Record) -> Result<()> {
        self.validate_record(&record)?;
        self.records.put(key, record.clone())?;
        for (slot, field) in self.schema.vector_fields().iter().enumerate() {
            let index = self
                .indexes
                .get_mut(&field.name)
                .ok_or_else(|| Error::schema(format!("no index for field '{}'", field.name)))?;
            index.put(key, record.vectors[slot].clone())?;
            self.dirty_indexes.insert(field.name.clone());
        }
        Ok(())
    }

    pub fn get_record(&self, key: Key) -> Result<Record> {
        self.records.get(key)
    }

    /// Removes a record from storage and from every index. Unknown keys are
    /// a `NotFound` error.
    pub fn delete_record(&mut self, key: Key) -> Result<()> {
        if !self.records.contains(key)? {
            return Err(Error::not_found(format!("record {key}")));
        }
        self.records.delete(key)?;
        for (name, index) in self.indexes.iter_mut() {
            if index.delete(key) > 0 {
                self.dirty_indexes.insert(name.clone());
            }
        }
        Ok(())
    }

    /// Replaces a field's centroid table.
    ///
    /// Postings already in the index stay in their old lists; only
    /// subsequent puts see the new centroids.
    pub fn set_centroids(&mut self, field: &str, centroids: Vec<Vector>) -> Result<()> {
        let index = self
            .indexes
            .get_mut(field)
            .ok_or_else(|| Error::schema(format!("vector field '{field}' not found")))?;
        index.set_centroids(centroids)?;
        self.dirty_indexes.insert(field.to_string());
        Ok(())
    }

    /// Persists every dirty record.
    pub fn flush_records(&self) -> Result<()> {
        self.records.flush()
    }

    /// Cache hit/miss counters for the record cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.records.stats()
    }

    /// Brute-force top-k over every stored record; the ground truth the
    /// index strategies are measured against.
    pub fn full_scan(&self, query: &Query) -> Result<Vec<QueryResult>> {
        self.handler(query).full_scan()
    }

    /// Multi-vector KNN with round-robin cluster probing and parallel
    /// candidate scoring.
    pub fn knn_search(&self, query: &Query, nprobe: usize) -> Result<Vec<QueryResult>> {
        self.handler(query).knn_search(nprobe)
    }

    /// Multi-vector KNN recomputing per-field top-k with doubling k, up to
    /// `k_threshold`.
    pub fn knn_search_iterative_merge(
        &self,
        query: &Query,
        nprobe: usize,
        k_threshold: usize,
    ) -> Result<Vec<QueryResult>> {
        self.handler(query).knn_search_iterative_merge(nprobe, k_threshold)
    }

    /// Multi-vector KNN stepping per-field iterators adaptively, sharing
    /// `n2` extra steps per round.
    pub fn knn_search_vbase(
        &self,
        query: &Query,
        nprobe: usize,
        n2: usize,
    ) -> Result<Vec<QueryResult>> {
        self.handler(query).knn_search_vbase(nprobe, n2)
    }

    /// Persists all dirty state and consumes the handle.
    pub fn close(mut self) -> Result<()> {
        self.persist_dirty()
    }

    fn handler<'a>(&'a self, query: &'a Query) -> QueryHandler<'a> {
        QueryHandler::new(&self.schema, &self.indexes, &self.records, query)
    }

    fn index(&self, field: &str) -> Result<&IvfFlatIndex> {
        self.indexes
            .get(field)
            .ok_or_else(|| Error::schema(format!("vector field '{field}' not found")))
    }

    fn validate_record(&self, record: &Record) -> Result<()> {
        let vector_fields = self.schema.vector_fields();
        if record.vectors.len() != vector_fields.len() {
            return Err(Error::shape(format!(
                "record {} carries {} vectors, schema declares {}",
                record.id,
                record.vectors.len(),
                vector_fields.len()
            )));
        }
        for (field, vector) in vector_fields.iter().zip(&record.vectors) {
            if vector.len() != field.dim {
                return Err(Error::shape(format!(
                    "record {} vector for field '{}' has dimension {}, expected {}",
                    record.id,
                    field.name,
                    vector.len(),
                    field.dim
                )));
            }
        }
        let scalar_fields = self.schema.scalar_fields();
        if record.scalars.len() != scalar_fields.len() {
            return Err(Error::shape(format!(
                "record {} carries {} scalars, schema declares {}",
                record.id,
                record.scalars.len(),
                scalar_fields.len()
            )));
        }
        for (field, scalar) in scalar_fields.iter().zip(&record.scalars) {
            if !field.scalar_type.matches(scalar) {
                return Err(Error::schema(format!(
                    "record {} scalar for field '{}' does not match its declared type",
                    record.id, field.name
                )));
            }
        }
        Ok(())
    }

    fn persist_dirty(&mut self) -> Result<()> {
        for name in &self.dirty_indexes {
            let index = self
                .indexes
                .get(name)
                .ok_or_else(|| Error::schema(format!("no index for field '{name}'")))?;
            for (number, partition) in codec::split_index(index).into_iter().enumerate() {
                self.kv.put(
                    &KvStore::index_partition_key(name, number),
                    &codec::encode(&partition)?,
                )?;
            }
            tracing::debug!(field = %name, "persisted index");
        }
        self.dirty_indexes.clear();
        self.records.flush()
    }
}

impl Drop for Db {
    fn drop(&mut self) {
        if let Err(error) = self.persist_dirty() {
            tracing::error!(path = %self.path.display(), %error, "failed to persist on drop");
        }
    }
}

fn load_index(kv: &KvStore, field: &str) -> Result<IvfFlatIndex> {
    let prefix = KvStore::index_prefix(field);
    let mut partitions: Vec<(usize, IndexPartition)> = Vec::new();
    for item in kv.scan_prefix(&prefix) {
        let (raw_key, raw_value) = item?;
        let number = KvStore::parse_partition_number(&raw_key, field)?;
        partitions.push((number, codec::decode(&raw_value)?));
    }
    codec::merge_partitions(field, partitions)
}
