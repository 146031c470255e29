//! Blob codec: bincode payloads with an integrity footer, and the index
//! partitioning scheme.
//!
//! Every persisted value is framed as `[bincode payload][magic "VXB1"][CRC32
//! BE]`. Indexes are split across partitions before writing: the partition
//! count grows with `nlist · dim` so no single value becomes unwieldy, and
//! the read path reassembles partitions in numeric order.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::{PARTITION_BASE_DIM, PARTITION_CENTROID_BUDGET};
use crate::error::{Error, Result};
use crate::ivf::index::{IvfFlatIndex, IvfList};
use crate::record::Vector;

/// Magic bytes separating the payload from the CRC32 footer.
const BLOB_MAGIC: &[u8; 4] = b"VXB1";

/// Serializes a value with the magic + CRC32 footer.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(value)?;
    let crc = crc32fast::hash(&payload);
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.extend_from_slice(&payload);
    out.extend_from_slice(BLOB_MAGIC);
    out.extend_from_slice(&crc.to_be_bytes());
    Ok(out)
}

/// Verifies the footer and deserializes the payload.
pub fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T> {
    if raw.len() < 8 || &raw[raw.len() - 8..raw.len() - 4] != BLOB_MAGIC {
        return Err(Error::corruption("blob is missing its magic footer"));
    }
    let payload = &raw[..raw.len() - 8];
    let stored = u32::from_be_bytes([
        raw[raw.len() - 4],
        raw[raw.len() - 3],
        raw[raw.len() - 2],
        raw[raw.len() - 1],
    ]);
    let computed = crc32fast::hash(payload);
    if computed != stored {
        return Err(Error::corruption(format!(
            "blob CRC32 mismatch: expected {stored:#010x}, got {computed:#010x}"
        )));
    }
    Ok(bincode::deserialize(payload)?)
}

/// One persisted slice of an index: shared metadata plus a contiguous run of
/// centroids and their posting lists.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct IndexPartition {
    pub field_name: String,
    pub dim: usize,
    pub nlist: usize,
    pub centroids: Vec<Vector>,
    pub lists: Vec<IvfList>,
}

/// Number of partitions for an index of `nlist` centroids of dimension
/// `dim`. Long vectors are penalised: a centroid counts as `dim / 128`
/// normalised centroids against a budget of 1000 per partition.
pub fn partition_count(nlist: usize, dim: usize) -> usize {
    (nlist * dim).div_ceil(PARTITION_BASE_DIM * PARTITION_CENTROID_BUDGET).max(1)
}

/// Splits an index into partitions for writing. Every partition carries
/// `floor(nlist / n)` centroids, with the remainder appended to the last.
pub fn split_index(index: &IvfFlatIndex) -> Vec<IndexPartition> {
    let nlist = index.nlist();
    let n_partitions = partition_count(nlist, index.dim());
    let partition_size = nlist / n_partitions;
    let remainder = nlist % n_partitions;

    let mut partitions = Vec::with_capacity(n_partitions);
    for i in 0..n_partitions {
        let offset = i * partition_size;
        let mut size = partition_size;
        if i == n_partitions - 1 {
            size += remainder;
        }
        partitions.push(IndexPartition {
            field_name: index.name().to_string(),
            dim: index.dim(),
            nlist,
            centroids: index.centroids()[offset..offset + size].to_vec(),
            lists: index.inverted_lists()[offset..offset + size].to_vec(),
        });
    }
    partitions
}

/// Reassembles an index from `(partition number, partition)` pairs.
///
/// Partitions are ordered numerically before concatenation, so a
/// lexicographic key scan (`:10` before `:2`) still merges correctly.
pub fn merge_partitions(
    field: &str,
    mut partitions: Vec<(usize, IndexPartition)>,
) -> Result<IvfFlatIndex> {
    if partitions.is_empty() {
        return Err(Error::not_found(format!(
            "no index partitions for field '{field}'"
        )));
    }
    partitions.sort_unstable_by_key(|(number, _)| *number);

    let (dim, nlist) = {
        let first = &partitions[0].1;
        (first.dim, first.nlist)
    };
    let mut centroids = Vec::with_capacity(nlist);
    let mut lists = Vec::with_capacity(nlist);
    for (_, partition) in partitions {
        if partition.field_name != field || partition.dim != dim || partition.nlist != nlist {
            return Err(Error::corruption(format!(
                "inconsistent partition metadata for index '{field}'"
            )));
        }
        centroids.extend(partition.centroids);
        lists.extend(partition.lists);
    }
    IvfFlatIndex::from_parts(field.to_string(), dim, nlist, centroids, lists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;
    use crate::record::Scalar;

    #[test]
    fn test_encode_decode_roundtrip() {
        let record = Record::new(7)
            .with_scalar(Scalar::String("Alice".into()))
            .with_vector(vec![1.0, 2.0, 3.0]);
        let blob = encode(&record).unwrap();
        let decoded: Record = decode(&blob).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_corruption_detected() {
        let blob = encode(&Record::new(1)).unwrap();
        let mut flipped = blob.clone();
        flipped[0] ^= 0xFF;
        assert!(matches!(
            decode::<Record>(&flipped),
            Err(Error::Corruption(_))
        ));
        assert!(decode::<Record>(&blob[..3]).is_err());
    }

    #[test]
    fn test_partition_count() {
        // Small indexes always get one partition.
        assert_eq!(partition_count(0, 3), 1);
        assert_eq!(partition_count(1, 3), 1);
        assert_eq!(partition_count(1000, 128), 1);
        assert_eq!(partition_count(1001, 128), 2);
        assert_eq!(partition_count(1000, 256), 2);
    }

    #[test]
    fn test_split_merge_roundtrip() {
        let mut index = IvfFlatIndex::new("vec", 2, 4);
        index
            .set_centroids(vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
            ])
            .unwrap();
        index.put(1, vec![0.1, 0.1]).unwrap();
        index.put(2, vec![0.9, 0.9]).unwrap();

        let parts = split_index(&index);
        let numbered = parts.into_iter().enumerate().collect();
        let merged = merge_partitions("vec", numbered).unwrap();
        assert_eq!(merged.centroids(), index.centroids());
        assert_eq!(merged.inverted_lists(), index.inverted_lists());
    }

    #[test]
    fn test_merge_orders_numerically() {
        // Simulate a lexicographic scan handing back partition 10 before 2.
        let make = |centroid: f32| IndexPartition {
            field_name: "vec".into(),
            dim: 1,
            nlist: 12,
            centroids: vec![vec![centroid]],
            lists: vec![Vec::new()],
        };
        let mut partitions: Vec<(usize, IndexPartition)> =
            (0..12).map(|i| (i, make(i as f32))).collect();
        partitions.swap(2, 10);
        let merged = merge_partitions("vec", partitions).unwrap();
        for (idx, centroid) in merged.centroids().iter().enumerate() {
            assert_eq!(centroid[0], idx as f32);
        }
    }

    #[test]
    fn test_merge_empty_is_not_found() {
        assert!(matches!(
            merge_partitions("vec", Vec::new()),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_split_covers_every_centroid() {
        let index = IvfFlatIndex::new("vec", 1, 7);
        let parts = split_index(&index);
        let total: usize = parts.iter().map(|p| p.centroids.len()).sum();
        assert_eq!(total, 7);
    }
}
