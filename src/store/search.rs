//! Read path: query → embedding → exact index search → threshold filter.
//!
//! The index is asked for `top_k * oversample` candidates so that some can be
//! dropped by the relevance threshold. Candidates are consumed lazily in rank
//! order and the walk stops as soon as `top_k` of them qualify.

use crate::embedding::EmbeddingProvider;
use crate::error::{Result, StoreError};
use crate::store::index::Neighbor;
use crate::store::types::DocumentRecord;
use crate::store::Store;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_THRESHOLD: f32 = 0.75;
pub const DEFAULT_OVERSAMPLE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    /// Minimum inner-product score, inclusive.
    pub threshold: f32,
    /// Candidates requested per wanted result.
    pub oversample: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
            oversample: DEFAULT_OVERSAMPLE,
        }
    }
}

/// A qualifying result, borrowing its record from the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit<'s> {
    pub score: f32,
    pub record: &'s DocumentRecord,
}

pub struct SearchService<'a> {
    provider: &'a dyn EmbeddingProvider,
    options: SearchOptions,
}

impl<'a> SearchService<'a> {
    pub fn new(provider: &'a dyn EmbeddingProvider, options: SearchOptions) -> Self {
        Self { provider, options }
    }

    /// Ranked hits for `query`, at most `top_k`, each scoring at least the
    /// threshold. An uninitialized or empty store yields no hits.
    pub fn search<'s>(&self, store: &'s Store, query: &str) -> Result<Vec<SearchHit<'s>>> {
        let Some(index) = store.index().filter(|i| !i.is_empty()) else {
            tracing::debug!("search on empty store");
            return Ok(Vec::new());
        };
        if self.options.top_k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self
            .provider
            .encode_one(query, true)
            .map_err(StoreError::embedding)?;
        let candidates = index.search(&embedding, self.candidate_count())?;
        Ok(self.collect_hits(store, candidates))
    }

    fn candidate_count(&self) -> usize {
        self.options
            .top_k
            .saturating_mul(self.options.oversample.max(1))
    }

    fn collect_hits<'s>(
        &self,
        store: &'s Store,
        candidates: Vec<Neighbor>,
    ) -> Vec<SearchHit<'s>> {
        let considered = candidates.len();
        let hits: Vec<SearchHit<'s>> = qualifying(candidates, store, self.options.threshold)
            .take(self.options.top_k)
            .collect();
        tracing::debug!(considered, returned = hits.len(), "search complete");
        hits
    }
}

/// Candidates at or above `threshold` that resolve to a stored record, in
/// the order given.
fn qualifying<'s>(
    candidates: impl IntoIterator<Item = Neighbor>,
    store: &'s Store,
    threshold: f32,
) -> impl Iterator<Item = SearchHit<'s>> {
    candidates
        .into_iter()
        .filter(move |n| n.score >= threshold)
        .filter_map(move |n| {
            store.get(n.position).ok().map(|record| SearchHit {
                score: n.score,
                record,
            })
        })
}
