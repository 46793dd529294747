//! Write path: text → embeddings → coupled append to index and metadata.

use std::ops::Range;

use serde::Serialize;

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, StoreError};
use crate::store::types::NewDocument;
use crate::store::{Recreation, Store};

/// Summary of a committed ingestion batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub added: usize,
    /// Documents in the store after the batch.
    pub total: usize,
    pub dimension: usize,
    pub ids: Range<usize>,
    /// Set when a dimension change wiped the previous documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recreated: Option<RecreationReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecreationReport {
    pub previous_dimension: usize,
    pub discarded: usize,
}

impl From<Recreation> for RecreationReport {
    fn from(r: Recreation) -> Self {
        Self {
            previous_dimension: r.previous_dimension,
            discarded: r.discarded,
        }
    }
}

pub struct IngestionService<'a> {
    provider: &'a dyn EmbeddingProvider,
    normalize: bool,
}

impl<'a> IngestionService<'a> {
    /// `normalize` must match how queries are embedded for scores to be cosine
    /// similarities; queries are always normalized.
    pub fn new(provider: &'a dyn EmbeddingProvider, normalize: bool) -> Self {
        Self {
            provider,
            normalize,
        }
    }

    /// Embed `batch` and append it to `store`, persisting both files.
    ///
    /// Nothing on disk changes unless the whole batch is committed.
    pub fn ingest(&self, store: &mut Store, batch: Vec<NewDocument>) -> Result<IngestReport> {
        if batch.is_empty() {
            return Err(StoreError::EmptyBatch);
        }

        let texts: Vec<&str> = batch.iter().map(|d| d.text.as_str()).collect();
        let embeddings = self
            .provider
            .encode(&texts, self.normalize)
            .map_err(StoreError::embedding)?;
        tracing::debug!(documents = batch.len(), vectors = embeddings.len(), "batch embedded");

        let added = batch.len();
        let outcome = store.append(batch, embeddings)?;

        if let Some(r) = outcome.recreated {
            tracing::warn!(
                previous_dimension = r.previous_dimension,
                discarded = r.discarded,
                "ingestion replaced the store because the embedding dimension changed"
            );
        }

        Ok(IngestReport {
            added,
            total: store.len(),
            dimension: store.dimension().unwrap_or_default(),
            ids: outcome.ids,
            recreated: outcome.recreated.map(RecreationReport::from),
        })
    }
}
