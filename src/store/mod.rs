//! The vector index and metadata table, owned and persisted as one unit.
//!
//! [`Store`] is the only way to mutate either file. It loads both together,
//! checks that they agree on the document count, applies appends to both, and
//! commits both without ever replacing one file while the other is unwritten.
//!
//! The store is single-writer. Mutation takes `&mut Store`; a store shared
//! across threads must sit behind a mutex, and separate processes writing the
//! same files must be serialized by the caller.

pub mod index;
pub mod ingest;
pub mod metadata;
pub(crate) mod persist;
pub mod search;
pub mod types;

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{ResetFailure, Result, StoreError};
use index::VectorIndex;
use metadata::MetadataStore;
use types::{DocumentRecord, NewDocument};

/// Locations of the two persisted files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
}

impl StorePaths {
    pub fn new(index: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            metadata: metadata.into(),
        }
    }

    /// `resume_index` and `metadata.json` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("resume_index"), dir.join("metadata.json"))
    }
}

/// An index replaced because the embedding dimension changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recreation {
    pub previous_dimension: usize,
    /// Documents dropped from both the index and the metadata.
    pub discarded: usize,
}

/// Result of a committed [`Store::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub ids: Range<usize>,
    pub recreated: Option<Recreation>,
}

#[derive(Debug)]
pub struct Store {
    paths: StorePaths,
    index: Option<VectorIndex>,
    metadata: MetadataStore,
}

impl Store {
    /// Load both files. Absent files are the uninitialized state; files that
    /// disagree on the document count are an error.
    pub fn open(paths: StorePaths) -> Result<Self> {
        let index = VectorIndex::load_if_exists(&paths.index)?;
        let metadata = MetadataStore::load(&paths.metadata)?;

        let index_count = index.as_ref().map_or(0, VectorIndex::count);
        if index_count != metadata.len() {
            return Err(StoreError::MisalignedStores {
                index_count,
                metadata_count: metadata.len(),
            });
        }

        Ok(Self {
            paths,
            index,
            metadata,
        })
    }

    /// Whether an index exists (possibly empty).
    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.index.as_ref().map(VectorIndex::dimension)
    }

    pub fn index(&self) -> Option<&VectorIndex> {
        self.index.as_ref()
    }

    pub fn get(&self, position: usize) -> Result<&DocumentRecord> {
        self.metadata.get(position)
    }

    pub fn records(&self) -> &[DocumentRecord] {
        self.metadata.records()
    }

    /// Append documents and their embeddings to both structures, then commit
    /// both files.
    ///
    /// If the embeddings' dimension differs from the current index, the index
    /// and the metadata are both cleared first and the loss is logged and
    /// returned. On any error the in-memory state and the files on disk are
    /// left as they were.
    pub fn append(
        &mut self,
        documents: Vec<NewDocument>,
        embeddings: Vec<Vec<f32>>,
    ) -> Result<AppendOutcome> {
        if documents.is_empty() {
            return Err(StoreError::EmptyBatch);
        }
        if documents.len() != embeddings.len() {
            return Err(StoreError::CountMismatch {
                documents: documents.len(),
                embeddings: embeddings.len(),
            });
        }
        if let Some(key) = documents.iter().find_map(NewDocument::reserved_field) {
            return Err(StoreError::ReservedField { key: key.to_string() });
        }
        let dimension = batch_dimension(&embeddings)?;

        let (mut index, recreated) = match &self.index {
            Some(existing) if existing.dimension() == dimension => (existing.clone(), None),
            Some(existing) => {
                let recreation = Recreation {
                    previous_dimension: existing.dimension(),
                    discarded: self.metadata.len(),
                };
                tracing::warn!(
                    previous = recreation.previous_dimension,
                    new = dimension,
                    discarded = recreation.discarded,
                    "embedding dimension changed, discarding existing index and metadata"
                );
                (VectorIndex::create(dimension)?, Some(recreation))
            }
            None => (VectorIndex::create(dimension)?, None),
        };
        let mut metadata = if recreated.is_some() {
            MetadataStore::new()
        } else {
            self.metadata.clone()
        };

        index.add(embeddings.as_slice())?;
        let ids = metadata.append(documents.into_iter().zip(embeddings));

        commit(&self.paths, &index, &metadata)?;

        tracing::info!(
            added = ids.len(),
            total = metadata.len(),
            dimension,
            "store committed"
        );
        self.index = Some(index);
        self.metadata = metadata;
        Ok(AppendOutcome { ids, recreated })
    }

    /// Delete both files, returning the store to the empty state.
    ///
    /// Both files are moved aside before either is deleted, so a failure
    /// leaves both in place and reports which one could not be moved.
    pub fn reset(paths: &StorePaths) -> Result<()> {
        let targets = [&paths.index, &paths.metadata];
        let mut moved: Vec<(PathBuf, PathBuf)> = Vec::new();

        for path in targets {
            if !path.exists() {
                continue;
            }
            let aside = persist::sibling(path, ".deleting");
            if let Err(source) = std::fs::rename(path, &aside) {
                for (original, aside) in moved.iter().rev() {
                    if let Err(e) = std::fs::rename(aside, original) {
                        tracing::error!(path = %original.display(), error = %e, "failed to restore file during reset");
                    }
                }
                return Err(StoreError::ResetFailed(vec![ResetFailure {
                    path: path.to_path_buf(),
                    source,
                }]));
            }
            moved.push((path.to_path_buf(), aside));
        }

        let failures: Vec<ResetFailure> = moved
            .into_iter()
            .filter_map(|(original, aside)| {
                std::fs::remove_file(&aside)
                    .err()
                    .map(|source| ResetFailure { path: original, source })
            })
            .collect();
        if !failures.is_empty() {
            return Err(StoreError::ResetFailed(failures));
        }

        tracing::info!(
            index = %paths.index.display(),
            metadata = %paths.metadata.display(),
            "store reset"
        );
        Ok(())
    }
}

/// Stage both files, then swap them in. A staging failure replaces nothing.
fn commit(paths: &StorePaths, index: &VectorIndex, metadata: &MetadataStore) -> Result<()> {
    let staged_index = persist::stage(&paths.index, &index.to_bytes())?;
    let staged_metadata = persist::stage(&paths.metadata, &metadata.to_json(&paths.metadata)?)?;
    staged_index.commit()?;
    staged_metadata.commit()
}

/// The shared length of every vector in the batch. Every component must be
/// finite so the metadata JSON can be read back.
fn batch_dimension(embeddings: &[Vec<f32>]) -> Result<usize> {
    let dimension = embeddings.first().map_or(0, Vec::len);
    if dimension == 0 {
        return Err(StoreError::InvalidDimension);
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
        return Err(StoreError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    for (document, embedding) in embeddings.iter().enumerate() {
        if let Some(component) = embedding.iter().position(|x| !x.is_finite()) {
            return Err(StoreError::NonFiniteEmbedding { document, component });
        }
    }
    Ok(dimension)
}
