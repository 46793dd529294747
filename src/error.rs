//! Error taxonomy for the index/metadata store.
//!
//! Missing files are never errors: they are the "not yet initialized" state and
//! are handled by returning empty stores or empty results.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by [`crate::store`] and the services built on it.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A vector's length disagrees with the index dimension.
    #[error("dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding provider produced zero-length vectors.
    #[error("embedding dimension must be at least 1")]
    InvalidDimension,

    /// An embedding holds NaN or an infinity, which JSON cannot represent.
    #[error("embedding for batch document {document} has a non-finite value at component {component}")]
    NonFiniteEmbedding { document: usize, component: usize },

    /// A structured field would collide with a record's own `id`, `text` or
    /// `embedding` key.
    #[error("structured field name '{key}' is reserved")]
    ReservedField { key: String },

    #[error("ingestion called with an empty batch")]
    EmptyBatch,

    /// The provider returned a different number of vectors than documents.
    #[error("got {embeddings} embeddings for {documents} documents")]
    CountMismatch { documents: usize, embeddings: usize },

    #[error("index file '{path}' is corrupt: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    #[error("metadata file '{path}' is corrupt: {reason}")]
    CorruptMetadata { path: PathBuf, reason: String },

    #[error("position {position} is out of range (store holds {len} records)")]
    OutOfRange { position: usize, len: usize },

    /// Index and metadata disagree on how many documents exist.
    #[error(
        "index holds {index_count} vectors but metadata holds {metadata_count} records; \
         run `cvsearch reset` and re-ingest"
    )]
    MisalignedStores {
        index_count: usize,
        metadata_count: usize,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The administrative reset could not remove every file.
    #[error("reset failed: {}", describe_failures(.0))]
    ResetFailed(Vec<ResetFailure>),

    #[error("embedding provider failed: {0}")]
    Embedding(Box<dyn std::error::Error + Send + Sync>),
}

/// One file the reset could not remove.
#[derive(Debug)]
pub struct ResetFailure {
    pub path: PathBuf,
    pub source: std::io::Error,
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn embedding(err: anyhow::Error) -> Self {
        Self::Embedding(err.into())
    }
}

fn describe_failures(failures: &[ResetFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.path.display(), f.source))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
