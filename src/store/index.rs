//! Flat exact-search vector index.
//!
//! Vectors are stored contiguously in insertion order and searched by an
//! exhaustive inner-product scan. The index performs no normalization: when
//! both the stored vectors and the query are unit length the score is cosine
//! similarity.
//!
//! # File format
//!
//! Little-endian throughout:
//! - Header (20 bytes): magic `CVIX`, `u32` format version, `u32` dimension,
//!   `u64` vector count
//! - Body: `count * dimension` contiguous `f32` values

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::store::persist;

const MAGIC_BYTES: &[u8; 4] = b"CVIX";
const FORMAT_VERSION: u32 = 1;
const HEADER_SIZE: usize = 20;
const BYTES_PER_F32: usize = 4;

/// One search result: the inner-product score and the stored vector's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub score: f32,
    pub position: usize,
}

/// What [`VectorIndex::load_or_create`] found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOpen {
    /// No file existed; a fresh index was created.
    Created,
    /// An index with the expected dimension was loaded.
    Loaded,
    /// An index with another dimension was discarded and replaced.
    Recreated {
        previous_dimension: usize,
        discarded: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    pub fn create(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(StoreError::InvalidDimension);
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Load a persisted index. A missing file is an I/O error here; use
    /// [`VectorIndex::load_if_exists`] when absence is a legitimate state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| StoreError::io(path, e))?;
        let index = Self::from_bytes(&bytes, path)?;
        tracing::info!(
            path = %path.display(),
            dimension = index.dimension,
            count = index.count(),
            "vector index loaded"
        );
        Ok(index)
    }

    pub fn load_if_exists(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    /// Load the index at `path`, or create and persist one with `expected_dim`.
    ///
    /// An existing index with a different dimension is discarded and recreated
    /// empty. Every stored vector is lost, so the caller must clear the
    /// matching metadata in the same step; [`crate::store::Store`] does this.
    pub fn load_or_create(path: impl AsRef<Path>, expected_dim: usize) -> Result<(Self, IndexOpen)> {
        let path = path.as_ref();
        match Self::load_if_exists(path)? {
            Some(index) if index.dimension == expected_dim => Ok((index, IndexOpen::Loaded)),
            Some(stale) => {
                tracing::warn!(
                    path = %path.display(),
                    previous = stale.dimension,
                    expected = expected_dim,
                    discarded = stale.count(),
                    "index dimension changed, recreating empty index"
                );
                let index = Self::create(expected_dim)?;
                index.persist(path)?;
                Ok((
                    index,
                    IndexOpen::Recreated {
                        previous_dimension: stale.dimension,
                        discarded: stale.count(),
                    },
                ))
            }
            None => {
                let index = Self::create(expected_dim)?;
                index.persist(path)?;
                tracing::info!(path = %path.display(), dimension = expected_dim, "created new vector index");
                Ok((index, IndexOpen::Created))
            }
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn count(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The stored vector at `position`, if any.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimension)?;
        let end = start.checked_add(self.dimension)?;
        self.data.get(start..end)
    }

    /// Append vectors in order. Nothing is appended if any vector has the
    /// wrong length.
    pub fn add<V: AsRef<[f32]>>(&mut self, vectors: &[V]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.as_ref().len() != self.dimension) {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.as_ref().len(),
            });
        }
        self.data.reserve(vectors.len() * self.dimension);
        for v in vectors {
            self.data.extend_from_slice(v.as_ref());
        }
        Ok(())
    }

    /// Exhaustive inner-product search returning at most `k` neighbours,
    /// best first. Equal scores are ordered by insertion position.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, v)| Neighbor {
                score: inner_product(query, v),
                position,
            })
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_unstable_by(rank);
        Ok(scored)
    }

    /// Atomically write the index to `path`.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        persist::stage(path.as_ref(), &self.to_bytes())?.commit()
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE + self.data.len() * BYTES_PER_F32);
        buf.extend_from_slice(MAGIC_BYTES);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        buf.extend_from_slice(&(self.count() as u64).to_le_bytes());
        for value in &self.data {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf
    }

    fn from_bytes(bytes: &[u8], path: &Path) -> Result<Self> {
        let corrupt = |reason: String| StoreError::CorruptIndex {
            path: PathBuf::from(path),
            reason,
        };

        if bytes.len() < HEADER_SIZE {
            return Err(corrupt(format!("file is {} bytes, shorter than the header", bytes.len())));
        }
        if &bytes[0..4] != MAGIC_BYTES {
            return Err(corrupt("bad magic bytes".into()));
        }
        let version = read_u32(&bytes[4..8]);
        if version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported format version {version}")));
        }
        let dimension = read_u32(&bytes[8..12]) as usize;
        if dimension == 0 {
            return Err(corrupt("dimension is zero".into()));
        }
        let count = read_u64(&bytes[12..20]);

        let expected_len = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(dimension))
            .and_then(|n| n.checked_mul(BYTES_PER_F32))
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| corrupt(format!("vector count {count} overflows")))?;
        if bytes.len() != expected_len {
            return Err(corrupt(format!(
                "expected {expected_len} bytes for {count} vectors of dimension {dimension}, found {}",
                bytes.len()
            )));
        }

        let data = bytes[HEADER_SIZE..]
            .chunks_exact(BYTES_PER_F32)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self { dimension, data })
    }
}

fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Descending score, then ascending position.
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.position.cmp(&b.position))
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u64(b: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&b[..8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn index_with(dimension: usize, vectors: &[Vec<f32>]) -> VectorIndex {
        let mut index = VectorIndex::create(dimension).unwrap();
        index.add(vectors).unwrap();
        index
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(VectorIndex::create(0), Err(StoreError::InvalidDimension)));
    }

    #[test]
    fn add_rejects_wrong_length_without_partial_append() {
        let mut index = VectorIndex::create(3).unwrap();
        let err = index
            .add(&[vec![1.0, 0.0, 0.0], vec![1.0, 0.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch { expected: 3, actual: 2 }
        ));
        assert_eq!(index.count(), 0);
    }

    #[test]
    fn search_ranks_by_descending_inner_product() {
        let index = index_with(
            2,
            &[vec![0.0, 1.0], vec![1.0, 0.0], vec![0.6, 0.8]],
        );
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![1, 2, 0]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!((hits[1].score - 0.6).abs() < 1e-6);
        assert!(hits[2].score.abs() < 1e-6);
    }

    #[test]
    fn ties_prefer_lower_position() {
        let index = index_with(
            2,
            &[vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]],
        );
        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn search_returns_fewer_when_index_is_small() {
        let index = index_with(2, &[vec![1.0, 0.0]]);
        assert_eq!(index.search(&[1.0, 0.0], 10).unwrap().len(), 1);
        assert!(index.search(&[1.0, 0.0], 0).unwrap().is_empty());
        let empty = VectorIndex::create(2).unwrap();
        assert!(empty.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn vector_out_of_range_is_none() {
        let index = index_with(1, &[vec![0.5]]);
        assert_eq!(index.vector(0), Some(&[0.5][..]));
        assert_eq!(index.vector(1), None);
        assert_eq!(index.vector(usize::MAX), None);
    }

    #[test]
    fn search_rejects_query_of_wrong_dimension() {
        let index = index_with(2, &[vec![1.0, 0.0]]);
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1),
            Err(StoreError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn persist_then_load_is_byte_identical() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("resume_index");
        let index = index_with(3, &[vec![0.1, -0.2, 0.3], vec![1.5, 2.5, -3.5]]);

        index.persist(&path).unwrap();
        let first = std::fs::read(&path).unwrap();
        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.vector(1), Some(&[1.5, 2.5, -3.5][..]));

        loaded.persist(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resume_index");
        let index = index_with(2, &[vec![1.0, 0.0], vec![0.0, 1.0]]);
        let bytes = index.to_bytes();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        assert!(matches!(
            VectorIndex::load(&path),
            Err(StoreError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resume_index");
        std::fs::write(&path, b"definitely not an index file").unwrap();
        assert!(matches!(
            VectorIndex::load(&path),
            Err(StoreError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn load_or_create_creates_and_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resume_index");

        let (index, open) = VectorIndex::load_or_create(&path, 4).unwrap();
        assert_eq!(open, IndexOpen::Created);
        assert_eq!(index.dimension(), 4);
        assert!(path.exists());

        let (_, open) = VectorIndex::load_or_create(&path, 4).unwrap();
        assert_eq!(open, IndexOpen::Loaded);
    }

    #[test]
    fn load_or_create_recreates_on_dimension_change() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("resume_index");
        index_with(2, &[vec![1.0, 0.0], vec![0.0, 1.0]])
            .persist(&path)
            .unwrap();

        let (index, open) = VectorIndex::load_or_create(&path, 3).unwrap();
        assert_eq!(
            open,
            IndexOpen::Recreated {
                previous_dimension: 2,
                discarded: 2
            }
        );
        assert_eq!(index.dimension(), 3);
        assert!(index.is_empty());
        assert_eq!(VectorIndex::load(&path).unwrap().dimension(), 3);
    }
}
