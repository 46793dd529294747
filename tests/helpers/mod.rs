#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use cvsearch::embedding::{l2_normalize, EmbeddingProvider};
use cvsearch::store::types::NewDocument;
use cvsearch::store::{Store, StorePaths};
use tempfile::TempDir;

/// Embedding provider backed by a fixed text → vector table.
pub struct TableProvider {
    table: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl TableProvider {
    pub fn new<'a>(entries: impl IntoIterator<Item = (&'a str, Vec<f32>)>) -> Self {
        Self {
            table: entries
                .into_iter()
                .map(|(text, v)| (text.to_string(), v))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for TableProvider {
    fn encode(&self, texts: &[&str], normalize: bool) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        texts
            .iter()
            .map(|t| {
                let mut v = self
                    .table
                    .get(*t)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no embedding for {t:?}"))?;
                if normalize {
                    l2_normalize(&mut v);
                }
                Ok(v)
            })
            .collect()
    }
}

/// Provider that always fails, standing in for a crashed model.
pub struct FailingProvider;

impl EmbeddingProvider for FailingProvider {
    fn encode(&self, _texts: &[&str], _normalize: bool) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("model unavailable")
    }
}

/// Provider that drops the last vector of every batch.
pub struct ShortProvider;

impl EmbeddingProvider for ShortProvider {
    fn encode(&self, texts: &[&str], _normalize: bool) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }
}

/// A temp directory and the store paths inside it.
pub fn temp_store() -> (TempDir, StorePaths) {
    let tmp = TempDir::new().unwrap();
    let paths = StorePaths::in_dir(tmp.path());
    (tmp, paths)
}

pub fn open(paths: &StorePaths) -> Store {
    Store::open(paths.clone()).unwrap()
}

pub fn docs(texts: &[&str]) -> Vec<NewDocument> {
    texts.iter().map(|t| NewDocument::new(*t)).collect()
}

/// Unit vector along `axis` in `dim` dimensions.
pub fn axis(dim: usize, axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; dim];
    v[axis] = 1.0;
    v
}

/// Snapshot of both files' bytes, `None` for absent files.
pub fn file_bytes(paths: &StorePaths) -> (Option<Vec<u8>>, Option<Vec<u8>>) {
    (
        std::fs::read(&paths.index).ok(),
        std::fs::read(&paths.metadata).ok(),
    )
}
